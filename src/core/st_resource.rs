use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

/// A single-threaded, reference-counted resource with interior mutability.
///
/// `StResource` lets several owners on the main thread share one value of type `T`.
/// The world uses it to hand its [`WorldSession`](crate::engine_state::voxels::session::WorldSession)
/// to gameplay code without a global registry.
///
/// # Examples
///
/// ```
/// use voxel_world::core::StResource;
///
/// let resource = StResource::new(vec![1, 2, 3]);
/// let handle = resource.clone();
///
/// // All clones share the same underlying data
/// handle.get_mut().push(4);
/// assert_eq!(resource.get().len(), 4);
/// ```
///
/// # Panics
/// - Panics if a shared borrow is alive while a mutable borrow is requested
/// - Panics if a mutable borrow is alive while any borrow is requested
///
/// The world is driven by one cooperative frame loop, so no borrow outlives the call
/// that created it. Parallelizing the world means swapping this for a lock-based handle.
#[derive(Debug, Default)]
pub struct StResource<T> {
    resource: Rc<RefCell<T>>,
}

impl<T> StResource<T> {
    /// Creates a new `StResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RefCell::new(resource)),
        }
    }

    /// Returns a guard that allows reading the contained value.
    pub fn get(&self) -> Ref<'_, T> {
        self.resource.borrow()
    }

    /// Returns a guard that allows modifying the contained value.
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.resource.borrow_mut()
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
