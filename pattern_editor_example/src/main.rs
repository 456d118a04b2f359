//! Scripted pattern editing session.
//!
//! Usage: `pattern_editor_example [options.json]`

use egui::{Event, Modifiers, PointerButton, Pos2, RawInput, Rect, Vec2};
use egui_pattern::{
    ChannelKind, EditorEvent, ModRecorder, NoteRangeOverlay, ParameterChange, PatternEditor,
    PatternEditorOptions, PatternGeometry, RecordContext, Song, SongDocument, ValueChange,
};
use std::path::Path;

const PITCH_CHANNEL: usize = 0;
const MOD_CHANNEL: usize = 2;

fn main() -> egui_pattern::Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let options = match std::env::args().nth(1) {
        Some(path) => PatternEditorOptions::load_from_path(Path::new(&path))?,
        None => PatternEditorOptions::default(),
    };
    let song = Song::new(
        &[ChannelKind::Pitch, ChannelKind::Noise, ChannelKind::Mod],
        4,
    );
    let mut doc = SongDocument::new(song);
    let mut editor = PatternEditor::new(options.clone());
    editor.set_event_listener(|event| log::info!("editor event: {:?}", event));

    draw_melody(&mut editor, &mut doc)?;
    click_through_egui(&mut editor, &mut doc)?;
    record_tempo_sweep(&mut doc, options)?;

    let mut overlay = NoteRangeOverlay::new();
    overlay.update(&doc.song.note_range_entries(PITCH_CHANNEL, 0));
    log::info!(
        "dimmed pitch ranges: {:?}",
        overlay.dimmed(0, doc.song.max_pitch(PITCH_CHANNEL))
    );

    for channel in [PITCH_CHANNEL, MOD_CHANNEL] {
        if let Some(pattern) = doc.song.pattern(channel, 0) {
            println!("channel {channel}:");
            println!("{}", serde_json::to_string_pretty(pattern)?);
        }
    }
    Ok(())
}

fn at(doc: &SongDocument, editor: &PatternEditor, part: f64, pitch: i32) -> Pos2 {
    let g = PatternGeometry::for_channel(&doc.song, doc.channel, editor.size());
    Pos2::new(g.part_to_pixel(part), g.pitch_to_pixel(pitch))
}

/// Three notes, one stretched, one bent, one turned into a chord.
fn draw_melody(editor: &mut PatternEditor, doc: &mut SongDocument) -> egui_pattern::Result<()> {
    let none = Modifiers::NONE;

    let from = at(doc, editor, 1.0, 60);
    let to = at(doc, editor, 40.0, 60);
    editor.pointer_moved(doc, from, none)?;
    editor.pointer_pressed(doc, from, none)?;
    editor.pointer_moved(doc, to, none)?;
    editor.pointer_released(doc, to)?;

    let p = at(doc, editor, 60.0, 64);
    editor.pointer_moved(doc, p, none)?;
    editor.pointer_pressed(doc, p, none)?;
    editor.pointer_released(doc, p)?;
    let chord = at(doc, editor, 60.0, 67);
    editor.pointer_moved(doc, chord, none)?;
    editor.pointer_pressed(doc, chord, none)?;
    editor.pointer_released(doc, chord)?;

    let start = at(doc, editor, 100.0, 62);
    editor.pointer_moved(doc, start, none)?;
    editor.pointer_pressed(doc, start, none)?;
    editor.pointer_released(doc, start)?;
    let bend_from = at(doc, editor, 106.0, 62);
    let bend_to = bend_from + Vec2::new(0.0, -30.0);
    editor.pointer_moved(doc, bend_from, none)?;
    editor.pointer_pressed(doc, bend_from, none)?;
    editor.pointer_moved(doc, bend_to, none)?;
    editor.pointer_released(doc, bend_to)?;

    log::info!(
        "drew {} notes",
        doc.current_pattern(0).map_or(0, |p| p.notes.len())
    );
    Ok(())
}

/// Feeds one click through an egui context, the way a host window would.
fn click_through_egui(editor: &mut PatternEditor, doc: &mut SongDocument) -> egui_pattern::Result<()> {
    let ctx = egui::Context::default();
    let screen = Rect::from_min_size(Pos2::ZERO, editor.size() + Vec2::splat(32.0));
    let target = at(doc, editor, 150.0, 55);
    let button = |pressed| Event::PointerButton {
        pos: target,
        button: PointerButton::Primary,
        pressed,
        modifiers: Modifiers::NONE,
    };
    let frames = [
        vec![Event::PointerMoved(target)],
        vec![button(true)],
        vec![button(false)],
    ];
    let mut failed = None;
    for events in frames {
        let input = RawInput {
            screen_rect: Some(screen),
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| {
            egui::Area::new(egui::Id::new("pattern"))
                .fixed_pos(Pos2::ZERO)
                .show(ctx, |ui| {
                    if let Err(err) = editor.handle_input(ui, doc) {
                        failed = Some(err);
                    }
                });
        });
        if let Some(err) = failed.take() {
            return Err(err);
        }
    }
    for event in editor.take_events() {
        if let EditorEvent::NotePreview { pitches, duration } = event {
            log::info!("would preview {:?} for {} parts", pitches, duration);
        }
    }
    Ok(())
}

/// Simulates a tempo slider held while playback moves through the first bar.
fn record_tempo_sweep(doc: &mut SongDocument, options: PatternEditorOptions) -> egui_pattern::Result<()> {
    let mut recorder = ModRecorder::new(options);
    let base = doc.song.tempo;
    for step in 0..8 {
        let next = base + step as f64 * 10.0;
        doc.song.tempo = next;
        let ctx = RecordContext {
            channel: PITCH_CHANNEL,
            instrument: 0,
            bar: 0,
            part: step * 24,
            from_slider: true,
        };
        let outcome = recorder.record(
            doc,
            ParameterChange::Tempo(ValueChange::new(base, next)),
            ctx,
        )?;
        log::info!("part {}: recorded {:?}", ctx.part, outcome.recorded);
    }
    recorder.release();
    for event in recorder.take_events() {
        log::debug!("recorder event: {:?}", event);
    }
    Ok(())
}
