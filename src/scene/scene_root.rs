//! Shared handle to the render-side tree
//!
//! The update thread takes the write lock for the duration of a sync pass.
//! The render thread only ever tries the read lock and skips its traversal
//! while a pass is running, so engine latency never reaches a frame. Upload
//! jobs never lock the tree; they reach the node through its mesh slot.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::scene_node_data::SceneNode;

/// Root of a mirrored volume, or empty before the engine reports one.
pub struct SceneRoot<B> {
    inner: Arc<RwLock<Option<SceneNode<B>>>>,
}

impl<B> SceneRoot<B> {
    pub fn new(root: Option<SceneNode<B>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(root)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Option<SceneNode<B>>> {
        self.inner.read()
    }

    /// Read access, or `None` while a sync pass holds the tree.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, Option<SceneNode<B>>>> {
        self.inner.try_read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Option<SceneNode<B>>> {
        self.inner.write()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_none()
    }
}

impl<B> Clone for SceneRoot<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
