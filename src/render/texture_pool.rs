//! Retain-counted point-sprite texture.
//!
//! The pool creates its texture on the first [`TexturePool::acquire`] and
//! drops it when the last [`TextureLease`] goes away. A later acquire
//! creates a fresh one.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

struct Shared<T> {
    factory: Box<dyn Fn() -> T>,
    texture: Option<Rc<T>>,
    retain: usize,
    created: usize,
}

impl<T> Shared<T> {
    fn release(&mut self) {
        self.retain = self.retain.saturating_sub(1);
        if self.retain == 0 && self.texture.take().is_some() {
            log::debug!("point texture released");
        }
    }
}

/// Explicit owner of the shared point texture. Clone it to hand the same
/// pool to several renderers.
pub struct TexturePool<T> {
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T> Clone for TexturePool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for TexturePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("TexturePool")
            .field("retain", &shared.retain)
            .field("live", &shared.texture.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> TexturePool<T> {
    /// Pool that builds its texture with `factory`.
    #[must_use]
    pub fn new(factory: impl Fn() -> T + 'static) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                factory: Box::new(factory),
                texture: None,
                retain: 0,
                created: 0,
            })),
        }
    }

    /// Retain the texture, creating it if no lease is outstanding.
    #[must_use]
    pub fn acquire(&self) -> TextureLease<T> {
        let mut shared = self.shared.borrow_mut();
        let texture = if let Some(texture) = &shared.texture {
            Rc::clone(texture)
        } else {
            let texture = Rc::new((shared.factory)());
            shared.texture = Some(Rc::clone(&texture));
            shared.created += 1;
            log::debug!("point texture created");
            texture
        };
        shared.retain += 1;
        TextureLease {
            pool: Rc::clone(&self.shared),
            texture,
        }
    }

    /// Outstanding leases.
    #[must_use]
    pub fn retain_count(&self) -> usize {
        self.shared.borrow().retain
    }

    /// Whether a texture currently exists.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.shared.borrow().texture.is_some()
    }

    /// How many times the factory has run.
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.shared.borrow().created
    }
}

/// Scoped hold on the pool's texture; releases on drop.
pub struct TextureLease<T> {
    pool: Rc<RefCell<Shared<T>>>,
    texture: Rc<T>,
}

impl<T> TextureLease<T> {
    /// The leased texture.
    #[must_use]
    pub fn texture(&self) -> &T {
        &self.texture
    }
}

impl<T> Deref for TextureLease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.texture
    }
}

impl<T> Clone for TextureLease<T> {
    fn clone(&self) -> Self {
        self.pool.borrow_mut().retain += 1;
        Self {
            pool: Rc::clone(&self.pool),
            texture: Rc::clone(&self.texture),
        }
    }
}

impl<T> Drop for TextureLease<T> {
    fn drop(&mut self) {
        self.pool.borrow_mut().release();
    }
}

impl<T: fmt::Debug> fmt::Debug for TextureLease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextureLease").field(&self.texture).finish()
    }
}
