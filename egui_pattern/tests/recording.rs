use egui_pattern::change::PatternRef;
use egui_pattern::config::MOD_COUNT;
use egui_pattern::invariants::check_song;
use egui_pattern::recorder::sanitize_interval;
use egui_pattern::{
    Change, ChangeSequence, ChannelKind, EditorEvent, ModRecorder, ModSetting, ModSlot, ModSource,
    Note, NotePin, ParameterChange, PatternEditorOptions, RecordContext, Song, SongDocument,
    ValueChange,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn tempo_song() -> Song {
    let mut song = Song::new(&[ChannelKind::Pitch, ChannelKind::Mod], 4);
    song.channels[1].instruments[0].modulators[2] = ModSlot {
        setting: ModSetting::Tempo,
        source: ModSource::Song,
        filter: None,
    };
    song
}

fn slider_at(part: i32) -> RecordContext {
    RecordContext {
        channel: 0,
        instrument: 0,
        bar: 1,
        part,
        from_slider: true,
    }
}

#[test]
fn tempo_slider_records_into_bound_slot() {
    init_logger();
    let mut doc = SongDocument::new(tempo_song());
    let mut recorder = ModRecorder::new(PatternEditorOptions::default());

    // The host applies the live value before asking for a recording.
    doc.song.tempo = 140.0;
    let outcome = recorder
        .record(
            &mut doc,
            ParameterChange::Tempo(ValueChange::new(120.0, 140.0)),
            slider_at(50),
        )
        .unwrap();

    assert!(outcome.restored_base);
    assert_eq!(doc.song.tempo, 120.0);
    assert_eq!(outcome.recorded.len(), 1);
    assert_eq!(outcome.recorded[0].slot, 2);

    let pitch = MOD_COUNT as i32 - 1 - 2;
    let pattern = doc.song.pattern(1, 1).expect("bar 1 pattern");
    let note = pattern
        .notes
        .iter()
        .find(|n| n.pitches == vec![pitch])
        .expect("tempo note");
    let quantum = recorder.time_quantum(&doc.song);
    assert_eq!(note.start, 50 / quantum * quantum);
    // Tempo is stored relative to its minimum of 30.
    assert!(note.pins.iter().all(|p| p.size == 110));
    check_song(&doc.song).unwrap();

    let events = recorder.take_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, EditorEvent::ModValueRecorded { slot: 2, value: 110, .. })));
}

#[test]
fn tempo_records_into_second_instrument_of_shared_pattern() {
    init_logger();
    let mut song = Song::new(&[ChannelKind::Pitch, ChannelKind::Mod], 4);
    song.channels[1].instruments.push(Default::default());
    song.channels[1].instruments[1].modulators[0] = ModSlot {
        setting: ModSetting::Tempo,
        source: ModSource::Song,
        filter: None,
    };
    let mut doc = SongDocument::new(song);
    let at = PatternRef::new(1, 0);
    doc.record(
        &ChangeSequence::new()
            .with(Change::EnsurePatternExists { at, instrument: 0 })
            .with(Change::EnsurePatternExists { at, instrument: 1 }),
    )
    .unwrap();

    let mut recorder = ModRecorder::new(PatternEditorOptions::default());
    doc.song.tempo = 140.0;
    let outcome = recorder
        .record(
            &mut doc,
            ParameterChange::Tempo(ValueChange::new(120.0, 140.0)),
            RecordContext {
                bar: 0,
                ..slider_at(0)
            },
        )
        .unwrap();

    assert_eq!(outcome.recorded.len(), 1);
    assert_eq!(outcome.recorded[0].instrument, 1);
    let pattern = doc.song.pattern(1, 0).unwrap();
    assert_eq!(pattern.instruments, vec![0, 1]);
    assert!(pattern.notes[0].pins.iter().all(|p| p.size == 110));
    check_song(&doc.song).unwrap();
}

#[test]
fn held_slider_builds_a_curve_and_undoes_per_step() {
    init_logger();
    let mut doc = SongDocument::new(tempo_song());
    let mut recorder = ModRecorder::new(PatternEditorOptions::default());
    let change = ParameterChange::Tempo(ValueChange::new(120.0, 150.0));

    recorder.record(&mut doc, change, slider_at(0)).unwrap();
    assert!(recorder.is_holding());
    for part in [6, 12, 18] {
        recorder.continue_held(&mut doc, slider_at(part)).unwrap();
    }
    recorder.release();
    assert!(!recorder.is_holding());

    let notes = &doc.song.pattern(1, 1).unwrap().notes;
    assert_eq!(notes.len(), 1);
    assert_eq!((notes[0].start, notes[0].end), (0, 24));

    assert!(doc.undo());
    let notes = &doc.song.pattern(1, 1).unwrap().notes;
    assert_eq!(notes[0].end, 18);
}

#[test]
fn operator_past_the_last_is_ignored() {
    init_logger();
    let mut doc = SongDocument::new(tempo_song());
    let mut recorder = ModRecorder::new(PatternEditorOptions::default());
    let outcome = recorder
        .record(
            &mut doc,
            ParameterChange::OperatorAmplitude {
                operator: 9,
                value: ValueChange::new(0.0, 10.0),
            },
            slider_at(0),
        )
        .unwrap();
    assert!(outcome.recorded.is_empty());
    assert!(!doc.can_undo());
}

fn seeded_doc(note: Note) -> SongDocument {
    let mut doc = SongDocument::new(Song::default());
    let at = PatternRef::new(0, 0);
    doc.record(
        &ChangeSequence::new()
            .with(Change::EnsurePatternExists { at, instrument: 0 })
            .with(Change::NoteAdded { at, note, index: 0 }),
    )
    .unwrap();
    doc
}

fn bumpy_note() -> Note {
    let mut note = Note::new(60, 0, 30, 4, false);
    note.pins = [(0, 2), (6, 4), (12, 6), (18, 4), (24, 2), (30, 4)]
        .into_iter()
        .map(|(time, size)| NotePin::new(0, time, size))
        .collect();
    note
}

#[test]
fn sanitize_clears_pins_strictly_inside_interval() {
    init_logger();
    let mut doc = seeded_doc(bumpy_note());
    let at = PatternRef::new(0, 0);
    doc.record(&ChangeSequence::single(sanitize_interval(at, 60, 8, 20)))
        .unwrap();

    let notes = &doc.song.pattern(0, 0).unwrap().notes;
    assert_eq!(notes.len(), 2);
    for note in notes {
        assert!(note.pins.len() >= 2);
        for pin in &note.pins {
            let time = note.start + pin.time;
            assert!(!(8 < time && time < 20), "pin at {time} survived");
        }
    }
    assert_eq!((notes[0].start, notes[0].end), (0, 8));
    assert_eq!((notes[1].start, notes[1].end), (20, 30));
    check_song(&doc.song).unwrap();
}

#[test]
fn sanitize_over_whole_note_removes_it() {
    init_logger();
    let mut doc = seeded_doc(bumpy_note());
    let at = PatternRef::new(0, 0);
    doc.record(&ChangeSequence::single(sanitize_interval(at, 60, 0, 30)))
        .unwrap();
    assert!(doc.song.pattern(0, 0).unwrap().notes.is_empty());
}

#[test]
fn sanitize_leaves_other_rows_alone() {
    init_logger();
    let mut doc = seeded_doc(bumpy_note());
    let before = doc.song.clone();
    let at = PatternRef::new(0, 0);
    doc.record(&ChangeSequence::single(sanitize_interval(at, 62, 0, 30)))
        .unwrap();
    assert_eq!(doc.song, before);
}
