use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::asset::{GraphicsAsset, Releasable, Resettable};
use crate::device::{GfxError, GraphicsDevice};

/// Something a [`Canvas2D`] draws.
pub trait CanvasElement {
    /// Render target changed size.
    fn resize(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        let _ = device;
        Ok(())
    }

    fn render(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError>;
}

/// Ordered, non-owning collection of canvas elements.
///
/// The canvas forwards lifecycle calls in insertion order but never controls
/// element lifetime: elements are held weakly and dropped ones are skipped.
/// Register the canvas with an [`crate::asset::AssetRegistry`] to receive
/// resize and release events.
#[derive(Default)]
pub struct Canvas2D {
    elements: Vec<Weak<RefCell<dyn CanvasElement>>>,
}

impl Canvas2D {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element<E: CanvasElement + 'static>(&mut self, element: &Rc<RefCell<E>>) {
        self.elements.push(downgrade(element));
    }

    pub fn remove_element<E: CanvasElement + 'static>(&mut self, element: &Rc<RefCell<E>>) {
        let weak = downgrade(element);
        self.elements.retain(|w| !Weak::ptr_eq(w, &weak));
    }

    /// Forgets every element without touching the elements themselves.
    pub fn clear_elements(&mut self) {
        self.elements.clear();
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.elements.iter().filter(|w| w.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit testing is not implemented; the canvas never captures input.
    ///
    /// `cursor` is in window pixels, `window_size` is `(width, height)`.
    pub fn intersects(&self, cursor: (f32, f32), window_size: (u32, u32)) -> bool {
        let _ = (cursor, window_size);
        false
    }

    /// Renders every live element in insertion order.
    pub fn render(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        for element in self.live() {
            match element.try_borrow_mut() {
                Ok(mut e) => e.render(device)?,
                Err(_) => log::warn!("canvas element busy during render; skipped"),
            }
        }
        Ok(())
    }

    fn live(&mut self) -> Vec<Rc<RefCell<dyn CanvasElement>>> {
        self.elements.retain(|w| w.strong_count() > 0);
        self.elements.iter().filter_map(Weak::upgrade).collect()
    }
}

impl Releasable for Canvas2D {
    fn release(&mut self, _device: &mut dyn GraphicsDevice) {
        self.clear_elements();
    }
}

impl Resettable for Canvas2D {
    /// The canvas owns no device objects.
    fn reset(&mut self, _device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        Ok(())
    }
}

impl GraphicsAsset for Canvas2D {
    /// Starts from an empty element list.
    fn init(&mut self, _device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        self.clear_elements();
        Ok(())
    }

    fn resize(&mut self, device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
        for element in self.live() {
            match element.try_borrow_mut() {
                Ok(mut e) => e.resize(device)?,
                Err(_) => log::warn!("canvas element busy during resize; skipped"),
            }
        }
        Ok(())
    }
}

fn downgrade<E: CanvasElement + 'static>(
    element: &Rc<RefCell<E>>,
) -> Weak<RefCell<dyn CanvasElement>> {
    let element: Rc<RefCell<dyn CanvasElement>> = element.clone();
    Rc::downgrade(&element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetRegistry;
    use crate::device::RecordingDevice;

    /// Appends its id to a shared log on every call.
    struct Tracer {
        id: u32,
        log: Rc<RefCell<Vec<(&'static str, u32)>>>,
    }

    impl CanvasElement for Tracer {
        fn resize(&mut self, _device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
            self.log.borrow_mut().push(("resize", self.id));
            Ok(())
        }

        fn render(&mut self, _device: &mut dyn GraphicsDevice) -> Result<(), GfxError> {
            self.log.borrow_mut().push(("render", self.id));
            Ok(())
        }
    }

    fn tracer(id: u32, log: &Rc<RefCell<Vec<(&'static str, u32)>>>) -> Rc<RefCell<Tracer>> {
        Rc::new(RefCell::new(Tracer { id, log: Rc::clone(log) }))
    }

    #[test]
    fn forwards_in_insertion_order() {
        let mut dev = RecordingDevice::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (tracer(1, &log), tracer(2, &log));

        let mut canvas = Canvas2D::new();
        canvas.add_element(&a);
        canvas.add_element(&b);
        canvas.resize(&mut dev).unwrap();
        canvas.render(&mut dev).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![("resize", 1), ("resize", 2), ("render", 1), ("render", 2)]
        );
    }

    #[test]
    fn release_clears_without_dropping_elements() {
        let mut dev = RecordingDevice::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = tracer(1, &log);

        let mut canvas = Canvas2D::new();
        canvas.add_element(&a);
        canvas.release(&mut dev);

        assert!(canvas.is_empty());
        assert_eq!(Rc::strong_count(&a), 1);
        canvas.render(&mut dev).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn dropped_elements_are_skipped() {
        let mut dev = RecordingDevice::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = tracer(1, &log);
        let mut canvas = Canvas2D::new();
        canvas.add_element(&a);
        {
            let b = tracer(2, &log);
            canvas.add_element(&b);
        }
        assert_eq!(canvas.len(), 1);
        canvas.render(&mut dev).unwrap();
        assert_eq!(*log.borrow(), vec![("render", 1)]);
    }

    #[test]
    fn remove_element_stops_forwarding() {
        let mut dev = RecordingDevice::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (tracer(1, &log), tracer(2, &log));
        let mut canvas = Canvas2D::new();
        canvas.add_element(&a);
        canvas.add_element(&b);
        canvas.remove_element(&a);
        canvas.render(&mut dev).unwrap();
        assert_eq!(*log.borrow(), vec![("render", 2)]);
    }

    #[test]
    fn never_intersects() {
        let canvas = Canvas2D::new();
        assert!(!canvas.intersects((10.0, 10.0), (100, 100)));
        assert!(!canvas.intersects((-1.0, 5000.0), (0, 0)));
    }

    #[test]
    fn init_starts_empty() {
        let mut dev = RecordingDevice::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = tracer(1, &log);

        let mut canvas = Canvas2D::new();
        canvas.add_element(&a);
        canvas.init(&mut dev).unwrap();
        assert!(canvas.is_empty());

        canvas.add_element(&a);
        canvas.reset(&mut dev).unwrap();
        assert_eq!(canvas.len(), 1);
        assert!(dev.calls().is_empty());
    }

    #[test]
    fn registry_events_reach_elements() {
        let mut dev = RecordingDevice::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = tracer(7, &log);

        let canvas = Rc::new(RefCell::new(Canvas2D::new()));
        canvas.borrow_mut().add_element(&a);
        let mut registry = AssetRegistry::new();
        registry.register(&canvas);

        registry.reset_all(&mut dev).unwrap();
        registry.resize_all(&mut dev).unwrap();
        registry.release_all(&mut dev);

        assert_eq!(*log.borrow(), vec![("resize", 7)]);
        assert!(canvas.borrow().is_empty());
    }
}
