//! Interactive star-rating widget
//!
//! A headless state machine driven by pointer and keyboard events. Hosts
//! translate their native input into [`StarEvent`]s, feed them to
//! [`StarWidget::dispatch`], and redraw from [`StarWidget::display_value`].
//!
//! Activating a star returns a future that runs the selection callback.
//! While that future is pending the widget ignores all input, so at most one
//! submission is in flight per widget. Pointer interaction comes back when
//! the future completes or is dropped.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use super::{render_stars, StarFill};
use crate::ratings::{Rating, MAX_STARS};

/// Lifecycle state of a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    /// Showing the committed selection
    Idle,
    /// Previewing the star under the pointer
    Hovering,
    /// A selection callback is running
    Submitting,
}

/// Keys the widget reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarKey {
    Right,
    Up,
    Left,
    Down,
    Enter,
    Space,
}

/// Input delivered to the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarEvent {
    /// The pointer moved onto star `n` (1-5)
    PointerEnter(u8),
    /// The pointer left the star region
    PointerLeave,
    /// Star `n` was clicked
    Activate(u8),
    /// A key was pressed while a star had focus
    Key(StarKey),
}

type SelectCallback = Box<dyn FnMut(Rating) -> BoxFuture<'static, ()> + Send>;

#[derive(Debug)]
struct WidgetInner {
    state: WidgetState,
    display: u8,
    committed: Option<Rating>,
    focused: Option<Rating>,
    pointer_enabled: bool,
}

impl WidgetInner {
    fn begin_submit(&mut self, rating: Rating) -> Rating {
        self.state = WidgetState::Submitting;
        self.pointer_enabled = false;
        self.committed = Some(rating);
        self.focused = Some(rating);
        self.display = rating.value();
        rating
    }

    fn settle(&mut self) {
        self.state = WidgetState::Idle;
        self.pointer_enabled = true;
        self.display = self.committed.map_or(0, Rating::value);
    }

    /// Applies an event; returns the rating to submit when one is activated
    fn handle(&mut self, event: StarEvent) -> Option<Rating> {
        if self.state == WidgetState::Submitting {
            return None;
        }

        match event {
            StarEvent::PointerEnter(value) => {
                if let Some(rating) = Rating::new(value) {
                    self.display = rating.value();
                    self.state = WidgetState::Hovering;
                }
                None
            }
            StarEvent::PointerLeave => {
                self.display = self.committed.map_or(0, Rating::value);
                self.state = WidgetState::Idle;
                None
            }
            StarEvent::Activate(value) => Rating::new(value).map(|r| self.begin_submit(r)),
            StarEvent::Key(StarKey::Right | StarKey::Up) => {
                self.move_focus(self.focused.map_or(Rating::MIN, Rating::increment));
                None
            }
            StarEvent::Key(StarKey::Left | StarKey::Down) => {
                self.move_focus(self.focused.map_or(Rating::MIN, Rating::decrement));
                None
            }
            StarEvent::Key(StarKey::Enter | StarKey::Space) => {
                self.focused.map(|r| self.begin_submit(r))
            }
        }
    }

    fn move_focus(&mut self, rating: Rating) {
        self.focused = Some(rating);
        self.display = rating.value();
    }
}

/// Resets the widget once the selection future finishes or is dropped
struct SettleGuard(Arc<Mutex<WidgetInner>>);

impl Drop for SettleGuard {
    fn drop(&mut self) {
        lock(&self.0).settle();
    }
}

fn lock(inner: &Mutex<WidgetInner>) -> MutexGuard<'_, WidgetInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One interactive star-rating widget
pub struct StarWidget {
    inner: Arc<Mutex<WidgetInner>>,
    on_select: SelectCallback,
}

impl std::fmt::Debug for StarWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarWidget")
            .field("inner", &*lock(&self.inner))
            .finish_non_exhaustive()
    }
}

/// Creates a widget that calls `on_select` with the chosen rating
///
/// The callback's output is ignored: whether it succeeds or fails, the widget
/// returns to [`WidgetState::Idle`] once its future completes.
pub fn initialize_star_events<F, Fut>(mut on_select: F) -> StarWidget
where
    F: FnMut(Rating) -> Fut + Send + 'static,
    Fut: Future + Send + 'static,
{
    StarWidget {
        inner: Arc::new(Mutex::new(WidgetInner {
            state: WidgetState::Idle,
            display: 0,
            committed: None,
            focused: None,
            pointer_enabled: true,
        })),
        on_select: Box::new(move |rating| {
            let fut = on_select(rating);
            async move {
                fut.await;
            }
            .boxed()
        }),
    }
}

impl StarWidget {
    /// Feeds one input event to the widget
    ///
    /// Returns the pending selection when the event activated a star. The
    /// caller must drive the returned future; input stays blocked until it
    /// completes or is dropped.
    pub fn dispatch(&mut self, event: StarEvent) -> Option<BoxFuture<'static, ()>> {
        let rating = lock(&self.inner).handle(event)?;
        debug!(rating = rating.value(), "star selected");

        let guard = SettleGuard(Arc::clone(&self.inner));
        let callback = (self.on_select)(rating);
        Some(
            async move {
                let _guard = guard;
                callback.await;
            }
            .boxed(),
        )
    }

    pub fn state(&self) -> WidgetState {
        lock(&self.inner).state
    }

    /// Star value currently shown (0 = none)
    pub fn display_value(&self) -> u8 {
        lock(&self.inner).display
    }

    /// Last activated rating, if any
    pub fn committed(&self) -> Option<Rating> {
        lock(&self.inner).committed
    }

    /// Star holding keyboard focus, if any
    pub fn focused(&self) -> Option<Rating> {
        lock(&self.inner).focused
    }

    /// Whether pointer input is currently accepted
    pub fn pointer_enabled(&self) -> bool {
        lock(&self.inner).pointer_enabled
    }

    /// Fill state of each star for the current display value
    ///
    /// The live widget only shows whole stars.
    pub fn fills(&self) -> [StarFill; MAX_STARS as usize] {
        let display = self.display_value();
        std::array::from_fn(|i| {
            if (i as u8) < display {
                StarFill::Full
            } else {
                StarFill::Empty
            }
        })
    }

    /// Interactive markup for the current display value
    pub fn markup(&self) -> String {
        render_stars(f64::from(self.display_value()), true)
    }
}
