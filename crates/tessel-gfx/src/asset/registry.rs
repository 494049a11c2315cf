use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::GraphicsAsset;
use crate::device::{GfxError, GraphicsDevice};

/// Non-owning list of assets that want device lifecycle events.
///
/// Assets are held weakly; dropping the last `Rc` unregisters implicitly and
/// the entry is pruned on the next broadcast.
#[derive(Default)]
pub struct AssetRegistry {
    assets: Vec<Weak<RefCell<dyn GraphicsAsset>>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<A: GraphicsAsset + 'static>(&mut self, asset: &Rc<RefCell<A>>) {
        let weak = downgrade(asset);
        if !self.assets.iter().any(|w| Weak::ptr_eq(w, &weak)) {
            self.assets.push(weak);
        }
    }

    pub fn unregister<A: GraphicsAsset + 'static>(&mut self, asset: &Rc<RefCell<A>>) {
        let weak = downgrade(asset);
        self.assets.retain(|w| !Weak::ptr_eq(w, &weak));
    }

    /// Number of live registered assets.
    pub fn len(&self) -> usize {
        self.assets.iter().filter(|w| w.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases every asset's device objects (device teardown).
    pub fn release_all(&mut self, device: &mut dyn GraphicsDevice) {
        for asset in self.live() {
            match asset.try_borrow_mut() {
                Ok(mut a) => a.release(device),
                Err(_) => log::warn!("asset busy during release; skipped"),
            }
        }
    }

    /// Recreates every asset's device objects (device-lost recovery).
    ///
    /// Stops at the first failure; assets after it keep their old state.
    pub fn reset_all(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        let live = self.live();
        log::debug!("resetting {} assets", live.len());
        for asset in live {
            match asset.try_borrow_mut() {
                Ok(mut a) => a.reset(device)?,
                Err(_) => log::warn!("asset busy during reset; skipped"),
            }
        }
        Ok(())
    }

    /// Forwards a render-target resize to every asset.
    pub fn resize_all(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        for asset in self.live() {
            match asset.try_borrow_mut() {
                Ok(mut a) => a.resize(device)?,
                Err(_) => log::warn!("asset busy during resize; skipped"),
            }
        }
        Ok(())
    }

    /// Prunes dead entries and upgrades the rest, in registration order.
    fn live(&mut self) -> Vec<Rc<RefCell<dyn GraphicsAsset>>> {
        self.assets.retain(|w| w.strong_count() > 0);
        self.assets.iter().filter_map(Weak::upgrade).collect()
    }
}

fn downgrade<A: GraphicsAsset + 'static>(
    asset: &Rc<RefCell<A>>,
) -> Weak<RefCell<dyn GraphicsAsset>> {
    let asset: Rc<RefCell<dyn GraphicsAsset>> = asset.clone();
    Rc::downgrade(&asset)
}
