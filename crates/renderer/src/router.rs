//! Bridges inbound host messages to the reactive cells and the renderer.
//!
//! The router owns two cells: the image (empty until the host delivers one)
//! and the pointer (initially centred). A `canvas` message starts pipeline
//! setup, which waits on a [`FirstImage`] signal; once the first image is
//! available its attributes are encoded, the canvas is armed with them and the
//! renderer is subscribed to the pointer cell. From then on every pointer
//! update sets the phase and issues exactly one render.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use tracing::{debug, error, info, warn};

use crate::cell::{ReactiveCell, Subscription};
use crate::encode::{self, PixelAttributes};
use crate::sort;
use crate::types::{PhaseMapping, Pointer, RawImage};

/// One host message; every present field is acted upon.
pub struct InboundMessage<C> {
    pub canvas: Option<C>,
    pub image: Option<RawImage>,
    pub mouse: Option<Pointer>,
}

impl<C> InboundMessage<C> {
    pub fn canvas(canvas: C) -> Self {
        Self {
            canvas: Some(canvas),
            ..Self::default()
        }
    }

    pub fn image(image: RawImage) -> Self {
        Self {
            image: Some(image),
            ..Self::default()
        }
    }

    pub fn mouse(pointer: Pointer) -> Self {
        Self {
            mouse: Some(pointer),
            ..Self::default()
        }
    }
}

impl<C> Default for InboundMessage<C> {
    fn default() -> Self {
        Self {
            canvas: None,
            image: None,
            mouse: None,
        }
    }
}

/// Draw side of an armed pipeline: uniform upload plus one point-list draw.
pub trait PhaseRenderer {
    fn set_phase(&mut self, phase: f32);
    fn render(&mut self) -> Result<()>;
}

/// A drawable surface that can be armed once the first image is known.
pub trait Canvas {
    type Renderer: PhaseRenderer + 'static;

    fn arm(self, image: &RawImage, attributes: &PixelAttributes) -> Result<Self::Renderer>;
}

/// Single-fulfillment signal resolved by the first image set on a cell.
///
/// Later images are ignored; the subscription is released as soon as the
/// signal has been taken.
pub struct FirstImage {
    receiver: Receiver<Arc<RawImage>>,
    subscription: Option<Subscription>,
}

impl FirstImage {
    pub fn listen(cell: &ReactiveCell<Arc<RawImage>>) -> Self {
        let (sender, receiver) = bounded(1);
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let subscription = cell.subscribe(move |image: &Arc<RawImage>| {
            if flag.replace(true) {
                return;
            }
            if sender.try_send(Arc::clone(image)).is_err() {
                debug!("first image signal already dropped");
            }
        });

        let subscription = if fired.get() {
            subscription.cancel();
            None
        } else {
            Some(subscription)
        };

        Self {
            receiver,
            subscription,
        }
    }

    /// Takes the image if it has arrived.
    pub fn poll(&mut self) -> Option<Arc<RawImage>> {
        match self.receiver.try_recv() {
            Ok(image) => {
                if let Some(subscription) = self.subscription.take() {
                    subscription.cancel();
                }
                Some(image)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

struct Armed<R> {
    renderer: Rc<RefCell<R>>,
    image: Arc<RawImage>,
    _pointer: Subscription,
}

enum Stage<C: Canvas> {
    Idle,
    AwaitingImage {
        canvas: C,
        first_image: FirstImage,
    },
    Armed(Armed<C::Renderer>),
}

pub struct Router<C: Canvas> {
    image: ReactiveCell<Arc<RawImage>>,
    pointer: ReactiveCell<Pointer>,
    mapping: PhaseMapping,
    stage: Stage<C>,
}

impl<C: Canvas> Router<C> {
    pub fn new(mapping: PhaseMapping) -> Self {
        Self {
            image: ReactiveCell::empty(),
            pointer: ReactiveCell::new(Pointer::default()),
            mapping,
            stage: Stage::Idle,
        }
    }

    /// Handles `mouse`, then `image`, then `canvas`, and arms the pipeline if
    /// that made the first image available to a waiting canvas.
    pub fn route(&mut self, message: InboundMessage<C>) -> Result<()> {
        let InboundMessage {
            canvas,
            image,
            mouse,
        } = message;

        if let Some(pointer) = mouse {
            self.pointer.set(pointer);
        }
        if let Some(image) = image {
            debug!(?image, "image payload received");
            self.image.set(Arc::new(image));
        }
        if let Some(canvas) = canvas {
            self.begin(canvas);
        }
        self.advance()
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.stage, Stage::Armed(_))
    }

    pub fn is_awaiting_image(&self) -> bool {
        matches!(self.stage, Stage::AwaitingImage { .. })
    }

    pub fn pointer(&self) -> Pointer {
        self.pointer.get().unwrap_or_default()
    }

    /// Image the current pipeline was armed with.
    pub fn armed_image(&self) -> Option<Arc<RawImage>> {
        match &self.stage {
            Stage::Armed(armed) => Some(Arc::clone(&armed.image)),
            _ => None,
        }
    }

    pub fn renderer(&self) -> Option<Rc<RefCell<C::Renderer>>> {
        match &self.stage {
            Stage::Armed(armed) => Some(Rc::clone(&armed.renderer)),
            _ => None,
        }
    }

    /// Re-issues a render at the current phase, e.g. after the surface was exposed.
    pub fn redraw(&self) -> Result<()> {
        let Some(renderer) = self.renderer() else {
            return Ok(());
        };
        let mut renderer = renderer
            .try_borrow_mut()
            .context("renderer is busy; skipping redraw")?;
        renderer.render()
    }

    fn begin(&mut self, canvas: C) {
        if !matches!(self.stage, Stage::Idle) {
            warn!("canvas received while a pipeline already exists; replacing it");
        }
        // Drop the previous pipeline (and its pointer subscription) first.
        self.stage = Stage::Idle;
        self.stage = Stage::AwaitingImage {
            first_image: FirstImage::listen(&self.image),
            canvas,
        };
        if self.image.get().is_none() {
            info!("canvas ready; waiting for the first image");
        }
    }

    fn advance(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.stage, Stage::Idle) {
            Stage::AwaitingImage {
                canvas,
                mut first_image,
            } => match first_image.poll() {
                Some(image) => {
                    self.stage = Stage::Armed(self.arm(canvas, image)?);
                }
                None => {
                    self.stage = Stage::AwaitingImage {
                        canvas,
                        first_image,
                    };
                }
            },
            other => self.stage = other,
        }
        Ok(())
    }

    fn arm(&self, canvas: C, image: Arc<RawImage>) -> Result<Armed<C::Renderer>> {
        if image.width == 0 || image.height == 0 {
            bail!(
                "image dimensions must be non-zero (got {}x{})",
                image.width,
                image.height
            );
        }

        let points = encode::point_count(image.width, image.height)?;
        if !encode::indices_are_exact(points) {
            warn!(
                points,
                limit = encode::EXACT_INDEX_LIMIT,
                "grid indices exceed f32 precision; original positions will be approximate"
            );
        }

        let sorted = sort::sorted_order(&image);
        let attributes = PixelAttributes::encode(image.width, image.height, &sorted)?;
        info!(
            width = image.width,
            height = image.height,
            points = attributes.vertex_count(),
            "arming pixel sort pipeline"
        );

        let renderer = canvas
            .arm(&image, &attributes)
            .context("failed to arm renderer")?;
        let renderer = Rc::new(RefCell::new(renderer));

        let mapping = self.mapping;
        let target = Rc::clone(&renderer);
        let subscription = self.pointer.subscribe(move |pointer: &Pointer| {
            let phase = mapping.phase_for(*pointer);
            let Ok(mut renderer) = target.try_borrow_mut() else {
                warn!(phase, "renderer is busy; dropping pointer update");
                return;
            };
            renderer.set_phase(phase);
            if let Err(err) = renderer.render() {
                error!(error = ?err, phase, "failed to render frame");
            }
        });

        Ok(Armed {
            renderer,
            image,
            _pointer: subscription,
        })
    }
}
