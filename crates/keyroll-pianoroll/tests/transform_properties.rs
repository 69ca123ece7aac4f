use keyroll_pianoroll::transform::{KeyTransform, NoteCoordTransform, TickTransform};
use proptest::prelude::*;

fn transform(
    pixels_per_tick: f64,
    scroll_left: f64,
    pixels_per_key: f64,
    scroll_top: f64,
) -> NoteCoordTransform {
    NoteCoordTransform::new(
        TickTransform::new(pixels_per_tick, scroll_left),
        KeyTransform::new(pixels_per_key, scroll_top, 128),
        2.0,
    )
}

proptest! {
    #[test]
    fn tick_survives_a_round_trip_through_pixels(
        tick in 0i64..10_000_000,
        pixels_per_tick in 0.015f64..1.5,
        scroll_left in 0.0f64..100_000.0,
    ) {
        let t = transform(pixels_per_tick, scroll_left, 12.0, 0.0);
        prop_assert_eq!(t.get_tick(t.get_x(tick)), tick);
    }

    #[test]
    fn higher_notes_are_drawn_higher(
        a in 0i32..128,
        b in 0i32..128,
        pixels_per_key in 6.0f64..48.0,
        scroll_top in 0.0f64..6000.0,
    ) {
        prop_assume!(a != b);
        let (low, high) = (a.min(b), a.max(b));
        let t = transform(0.1, 0.0, pixels_per_key, scroll_top);
        prop_assert!(t.get_y(low) > t.get_y(high));
    }

    #[test]
    fn every_point_of_a_row_maps_back_to_its_note(
        note_number in 0i32..128,
        fraction in 0.0f64..0.99,
        pixels_per_key in 6.0f64..48.0,
        scroll_top in 0.0f64..6000.0,
    ) {
        let t = transform(0.1, 0.0, pixels_per_key, scroll_top);
        let y = t.get_y(note_number) + fraction * pixels_per_key;
        prop_assert_eq!(t.get_note_number(y), note_number);
    }

    #[test]
    fn note_rects_never_collapse(
        duration in 0i64..100_000,
        pixels_per_tick in 0.015f64..1.5,
    ) {
        let t = transform(pixels_per_tick, 0.0, 12.0, 0.0);
        let note = keyroll_pianoroll::song::NoteEvent {
            id: 0,
            tick: 0,
            duration,
            note_number: 60,
            velocity: 100,
        };
        let rect = t.get_rect(&note);
        prop_assert!(rect.width >= 2.0);
        prop_assert_eq!(rect.height, 12.0);
    }
}
