use std::rc::Rc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keyroll_pianoroll::midi::RecordingOutput;
use keyroll_pianoroll::song::{Song, Track};
use keyroll_pianoroll::{EditorConfig, EditorSession};
use keyroll_reactive::Store;

fn dense_song(notes: i64) -> Song {
    let mut song = Song::new(480);
    song.add_track(Track::conductor());
    let id = song.add_track(Track::new("Piano", 0));
    if let Some(track) = song.track_mut(id) {
        for i in 0..notes {
            track.add_note(i * 120, 240, (36 + i % 48) as u8, 100);
        }
    }
    song
}

fn scroll_10k_notes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pianoroll");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("visible_notes_after_scroll_10k", |b| {
        let session = EditorSession::new(
            EditorConfig::default(),
            dense_song(10_000),
            Rc::new(RecordingOutput::new()),
        );
        session.start();
        let piano_roll = session.piano_roll();
        piano_roll.tick_scroll().set_canvas_width(1200.0);
        let mut scroll = 0.0;

        b.iter(|| {
            scroll = (scroll + 37.0) % 10_000.0;
            piano_roll.tick_scroll().set_scroll_left_in_pixels(scroll);
            black_box(piano_roll.notes().len())
        });
    });

    group.bench_function("batched_writes_one_flush", |b| {
        let store = Store::new();
        let cells: Vec<_> = (0..64i32).map(|i| store.observable(i64::from(i))).collect();
        let sum = {
            let cells = cells.clone();
            store.computed(move || cells.iter().map(|cell| cell.get()).sum::<i64>())
        };
        let _subscription = {
            let sum = sum.clone();
            store.subscribe(move || sum.get(), |value: &i64| {
                black_box(*value);
            })
        };

        b.iter(|| {
            store.batch(|| {
                for cell in &cells {
                    cell.update(|value| *value += 1);
                }
            })
        });
    });

    group.finish();
}

criterion_group!(benches, scroll_10k_notes);
criterion_main!(benches);
