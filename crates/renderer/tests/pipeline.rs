use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use renderer::{
    vertex_position, Canvas, InboundMessage, PhaseMapping, PhaseRenderer, PixelAttributes,
    Pointer, RawImage, Router,
};

#[derive(Default)]
struct Recorded {
    attributes: Option<PixelAttributes>,
    phases: Vec<f32>,
}

struct CaptureCanvas(Rc<RefCell<Recorded>>);

struct CaptureRenderer {
    recorded: Rc<RefCell<Recorded>>,
    phase: f32,
}

impl Canvas for CaptureCanvas {
    type Renderer = CaptureRenderer;

    fn arm(self, _image: &RawImage, attributes: &PixelAttributes) -> Result<CaptureRenderer> {
        self.0.borrow_mut().attributes = Some(attributes.clone());
        Ok(CaptureRenderer {
            recorded: self.0,
            phase: 0.0,
        })
    }
}

impl PhaseRenderer for CaptureRenderer {
    fn set_phase(&mut self, phase: f32) {
        self.phase = phase;
    }

    fn render(&mut self) -> Result<()> {
        self.recorded.borrow_mut().phases.push(self.phase);
        Ok(())
    }
}

/// Clip-space positions of every drawn point at the last rendered phase.
fn frame(recorded: &Recorded) -> Vec<[f32; 2]> {
    let attributes = recorded.attributes.as_ref().expect("pipeline armed");
    let phase = *recorded.phases.last().expect("at least one render");
    (0..attributes.vertex_count() as usize)
        .map(|vertex| vertex_position(attributes, vertex, phase).expect("vertex in range"))
        .collect()
}

#[test]
fn red_and_black_pair_interpolates_between_layouts() {
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut router = Router::new(PhaseMapping::default());

    router
        .route(InboundMessage::canvas(CaptureCanvas(Rc::clone(&recorded))))
        .unwrap();
    router
        .route(InboundMessage::image(RawImage::new(
            2,
            1,
            vec![255, 0, 0, 0, 0, 0, 0, 0],
        )))
        .unwrap();

    {
        let recorded = recorded.borrow();
        let attributes = recorded.attributes.as_ref().unwrap();
        let order: Vec<[f32; 4]> = attributes
            .color_indices
            .iter()
            .map(|attribute| attribute.color_index)
            .collect();
        assert_eq!(order, vec![[0.0, 0.0, 0.0, 2.0], [255.0, 0.0, 0.0, 1.0]]);
        // Centred pointer: phase 0.5 on arming.
        assert_eq!(recorded.phases, vec![0.5]);
        assert_eq!(frame(&recorded), vec![[-1.0, -0.5], [0.0, 0.0]]);
    }

    router
        .route(InboundMessage::mouse(Pointer::new(0.0, -0.5)))
        .unwrap();
    assert_eq!(frame(&recorded.borrow()), vec![[-1.0, -0.5], [0.0, -0.5]]);

    router
        .route(InboundMessage::mouse(Pointer::new(0.0, 0.5)))
        .unwrap();
    assert_eq!(frame(&recorded.borrow()), vec![[-1.0, -0.5], [0.0, 0.5]]);

    assert_eq!(recorded.borrow().phases, vec![0.5, 0.0, 1.0]);
}

#[test]
fn pointer_moves_before_image_only_affect_first_frame() {
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut router = Router::new(PhaseMapping::default());

    router
        .route(InboundMessage::canvas(CaptureCanvas(Rc::clone(&recorded))))
        .unwrap();
    for y in [-0.4, 0.1, 0.3] {
        router.route(InboundMessage::mouse(Pointer::new(0.2, y))).unwrap();
    }
    assert!(recorded.borrow().phases.is_empty());

    router
        .route(InboundMessage::image(RawImage::new(1, 1, vec![9, 9, 9, 255])))
        .unwrap();
    assert_eq!(recorded.borrow().phases, vec![0.8]);
}

#[test]
fn truncated_payload_draws_only_complete_samples() {
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut router = Router::new(PhaseMapping::default());

    // 2x2 grid announced, three full pixels plus two stray bytes delivered.
    let mut data = vec![10u8; 12];
    data.extend_from_slice(&[1, 2]);
    router
        .route(InboundMessage {
            canvas: Some(CaptureCanvas(Rc::clone(&recorded))),
            image: Some(RawImage::new(2, 2, data)),
            mouse: None,
        })
        .unwrap();

    let recorded = recorded.borrow();
    let attributes = recorded.attributes.as_ref().unwrap();
    assert_eq!(attributes.positions.len(), 4);
    assert_eq!(attributes.color_indices.len(), 3);
    assert_eq!(attributes.vertex_count(), 3);
    assert_eq!(frame(&recorded).len(), 3);
}

#[test]
fn custom_phase_mapping_is_applied() {
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut router = Router::new(PhaseMapping {
        gain: 0.5,
        offset: 1.0,
    });
    router
        .route(InboundMessage::image(RawImage::new(1, 1, vec![0, 0, 0, 0])))
        .unwrap();
    router
        .route(InboundMessage::canvas(CaptureCanvas(Rc::clone(&recorded))))
        .unwrap();
    router
        .route(InboundMessage::mouse(Pointer::new(0.0, 0.5)))
        .unwrap();

    assert_eq!(recorded.borrow().phases, vec![0.5, 0.75]);
}
