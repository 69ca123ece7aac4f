//! Scroll offsets and zoom of both axes of the note grid.

use keyroll_reactive::{Computed, Observable, Store, Subscription};
use tracing::trace;

use crate::config::{EditorConfig, ScaleLimits};
use crate::player::Player;
use crate::song::Song;
use crate::transform::{KeyTransform, TickTransform};

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Horizontal scroll and zoom, measured in canvas pixels.
#[derive(Clone)]
pub struct TickScroll {
    store: Store,
    player: Player,
    limits: ScaleLimits,
    scroll_left: Observable<f64>,
    scale_x: Observable<f64>,
    canvas_width: Observable<f64>,
    auto_scroll: Observable<bool>,
    transform: Computed<TickTransform>,
    content_width: Computed<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AutoScrollInput {
    active: bool,
    position_x: f64,
    canvas_width: f64,
}

impl TickScroll {
    pub fn new(
        store: &Store,
        song: &Observable<Song>,
        player: &Player,
        config: &EditorConfig,
    ) -> Self {
        let limits = config.scale_x;
        let scroll_left = store.observable(0.0);
        let scale_x = store.observable(limits.clamp(limits.initial));
        let canvas_width = store.observable(0.0);
        let auto_scroll = store.observable(config.auto_scroll);

        let base = config.base_pixels_per_tick;
        let transform = {
            let (scroll_left, scale_x) = (scroll_left.clone(), scale_x.clone());
            store.computed(move || TickTransform::new(base * scale_x.get(), scroll_left.get()))
        };
        let appendix_beats = i64::from(config.appendix_beats);
        let content_width = {
            let (song, player, scale_x) = (song.clone(), player.clone(), scale_x.clone());
            store.computed(move || {
                let (end, timebase) =
                    song.with(|song| (song.end_of_song(), i64::from(song.timebase)));
                let ticks = end.max(player.position()) + appendix_beats * timebase;
                ticks as f64 * base * scale_x.get()
            })
        };

        Self {
            store: store.clone(),
            player: player.clone(),
            limits,
            scroll_left,
            scale_x,
            canvas_width,
            auto_scroll,
            transform,
            content_width,
        }
    }

    pub fn transform(&self) -> TickTransform {
        self.transform.get()
    }

    pub fn pixels_per_tick(&self) -> f64 {
        self.transform.with(|t| t.pixels_per_tick)
    }

    pub fn scroll_left(&self) -> f64 {
        self.scroll_left.get()
    }

    /// Tick at the left edge of the canvas.
    pub fn scroll_left_ticks(&self) -> i64 {
        self.transform.with(|t| t.get_tick(0.0))
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x.get()
    }

    pub fn canvas_width(&self) -> f64 {
        self.canvas_width.get()
    }

    pub fn content_width(&self) -> f64 {
        self.content_width.get()
    }

    pub fn max_scroll_left(&self) -> f64 {
        (self.content_width() - self.canvas_width()).max(0.0)
    }

    pub fn set_scroll_left_in_pixels(&self, pixels: f64) {
        let clamped = finite_or_zero(pixels).clamp(0.0, self.max_scroll_left());
        self.scroll_left.set(clamped);
    }

    pub fn set_scroll_left_in_ticks(&self, tick: i64) {
        self.set_scroll_left_in_pixels(tick as f64 * self.pixels_per_tick());
    }

    pub fn set_canvas_width(&self, width: f64) {
        self.store.batch(|| {
            self.canvas_width.set(finite_or_zero(width).max(0.0));
            self.set_scroll_left_in_pixels(self.scroll_left());
        });
    }

    /// Sets the zoom, keeping the scroll offset inside the new content width.
    pub fn set_scale_x(&self, scale: f64) {
        self.store.batch(|| {
            self.scale_x.set(self.limits.clamp(scale));
            self.set_scroll_left_in_pixels(self.scroll_left());
        });
    }

    /// Zooms by `1 + delta` while the tick under canvas x `pixel_x` stays put.
    pub fn scale_around_pointer_x(&self, delta: f64, pixel_x: f64) {
        let anchor = (self.scroll_left() + pixel_x) / self.pixels_per_tick();
        self.store.batch(|| {
            self.scale_x.set(self.limits.clamp(self.scale_x() * (1.0 + delta)));
            self.set_scroll_left_in_pixels(anchor * self.pixels_per_tick() - pixel_x);
        });
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll.get()
    }

    pub fn set_auto_scroll(&self, enabled: bool) {
        self.auto_scroll.set(enabled);
    }

    /// Keeps the playback position inside the visible window while playing.
    ///
    /// The returned subscription must be held for as long as the scrolling
    /// should continue.
    pub fn set_up_auto_scroll(&self) -> Subscription {
        let selector = {
            let this = self.clone();
            move || AutoScrollInput {
                active: this.auto_scroll() && this.player.is_playing(),
                position_x: this.player.position() as f64 * this.pixels_per_tick(),
                canvas_width: this.canvas_width(),
            }
        };
        let this = self.clone();
        self.store.subscribe(selector, move |input: &AutoScrollInput| {
            if !input.active {
                return;
            }
            let scroll_left = this.scroll_left();
            if input.position_x > scroll_left + input.canvas_width {
                trace!(x = input.position_x, "auto scroll forward");
                this.set_scroll_left_in_pixels(input.position_x - input.canvas_width);
            } else if input.position_x < scroll_left {
                trace!(x = input.position_x, "auto scroll back");
                this.set_scroll_left_in_pixels(input.position_x);
            }
        })
    }
}

/// Vertical scroll and zoom, measured in canvas pixels.
#[derive(Clone)]
pub struct KeyScroll {
    store: Store,
    limits: ScaleLimits,
    key_height: f64,
    number_of_keys: i32,
    scroll_top: Observable<f64>,
    scale_y: Observable<f64>,
    canvas_height: Observable<f64>,
    transform: Computed<KeyTransform>,
}

impl KeyScroll {
    pub fn new(store: &Store, config: &EditorConfig) -> Self {
        let limits = config.scale_y;
        let key_height = config.key_height;
        let number_of_keys = i32::from(config.number_of_keys);
        let scroll_top = store.observable(0.0);
        let scale_y = store.observable(limits.clamp(limits.initial));
        let transform = {
            let (scroll_top, scale_y) = (scroll_top.clone(), scale_y.clone());
            store.computed(move || {
                KeyTransform::new(key_height * scale_y.get(), scroll_top.get(), number_of_keys)
            })
        };
        Self {
            store: store.clone(),
            limits,
            key_height,
            number_of_keys,
            scroll_top,
            scale_y,
            canvas_height: store.observable(0.0),
            transform,
        }
    }

    pub fn transform(&self) -> KeyTransform {
        self.transform.get()
    }

    pub fn number_of_keys(&self) -> i32 {
        self.number_of_keys
    }

    pub fn key_height(&self) -> f64 {
        self.key_height
    }

    pub fn pixels_per_key(&self) -> f64 {
        self.transform.with(|t| t.pixels_per_key)
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top.get()
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y.get()
    }

    pub fn canvas_height(&self) -> f64 {
        self.canvas_height.get()
    }

    pub fn content_height(&self) -> f64 {
        self.number_of_keys as f64 * self.pixels_per_key()
    }

    pub fn max_scroll_top(&self) -> f64 {
        (self.content_height() - self.canvas_height()).max(0.0)
    }

    pub fn set_scroll_top_in_pixels(&self, pixels: f64) {
        let clamped = finite_or_zero(pixels).clamp(0.0, self.max_scroll_top());
        self.scroll_top.set(clamped);
    }

    pub fn set_canvas_height(&self, height: f64) {
        self.store.batch(|| {
            self.canvas_height.set(finite_or_zero(height).max(0.0));
            self.set_scroll_top_in_pixels(self.scroll_top());
        });
    }

    pub fn set_scale_y(&self, scale: f64) {
        self.store.batch(|| {
            self.scale_y.set(self.limits.clamp(scale));
            self.set_scroll_top_in_pixels(self.scroll_top());
        });
    }

    /// Centres the row of `note_number` vertically.
    pub fn scroll_top_to_note_number(&self, note_number: i32) {
        let ppk = self.pixels_per_key();
        let row_centre = (self.number_of_keys - note_number - 1) as f64 * ppk + ppk / 2.0;
        self.set_scroll_top_in_pixels(row_centre - self.canvas_height() / 2.0);
    }
}
