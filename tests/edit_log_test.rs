use chart_timeline::{
    Chart, ChartEditor, ChartError, EditOutcome, EffectFlags, EngineConfig, EventChannel, EventTarget, Operation,
    RationalTime,
};

fn beat(w: i64) -> RationalTime {
    RationalTime::from_integer(w)
}

const CHART: &str = r#"{
    "duration": [16, 0, 1],
    "bpmList": [
        { "startTime": [0, 0, 1], "bpm": 120.0 },
        { "startTime": [8, 0, 1], "bpm": 240.0 }
    ],
    "judgeLines": [{
        "name": "main",
        "moveX": [
            { "startTime": [0, 0, 1], "endTime": [4, 0, 1], "start": 0.0, "end": 100.0 },
            { "startTime": [4, 0, 1], "endTime": [8, 0, 1], "start": 100.0, "end": 50.0 }
        ],
        "alpha": [
            { "startTime": [0, 0, 1], "endTime": [2, 1, 2], "start": 0.0, "end": 255.0,
              "easing": { "curve": "sineOut" } }
        ]
    }]
}"#;

fn move_x() -> EventTarget {
    EventTarget::new(0, EventChannel::MoveX)
}

fn load() -> ChartEditor {
    ChartEditor::from_json(CHART, EngineConfig::default()).unwrap()
}

#[test]
fn chained_value_edits_undo_in_one_step() {
    let mut editor = load();
    let node = editor.chart().events(move_x()).unwrap().first_start().index();
    for k in 1..=25 {
        editor.set_event_value(move_x(), node, k as f64).unwrap();
    }
    assert_eq!(editor.edit_state().undo_count, 1);
    assert_eq!(editor.chart().value_at(move_x(), beat(0)).unwrap(), 25.0);

    let outcome = editor.undo().unwrap();
    assert_eq!(outcome, EditOutcome::Undone(EffectFlags::DISPLAY));
    assert_eq!(editor.chart().value_at(move_x(), beat(0)).unwrap(), 0.0);
    assert_eq!(editor.undo().unwrap(), EditOutcome::NothingToUndo);
}

#[test]
fn apply_after_undo_drops_redo() {
    let mut editor = load();
    editor.insert_boundary(move_x(), beat(2), 10.0, 20.0).unwrap();
    editor.insert_boundary(move_x(), beat(6), 30.0, 40.0).unwrap();
    editor.undo().unwrap();
    assert!(editor.edit_state().can_redo);

    editor.insert_tempo(beat(4), 60.0).unwrap();
    assert!(!editor.edit_state().can_redo);
    assert_eq!(editor.redo().unwrap(), EditOutcome::NothingToRedo);
    assert_eq!(editor.chart().events(move_x()).unwrap().event_count(), 3);
}

#[test]
fn equal_time_insert_overwrites_and_undoes_exactly() {
    let mut editor = load();
    let before = editor.chart().events(move_x()).unwrap().len();
    let outcome = editor.insert_boundary(move_x(), beat(4), 100.0, 7.0).unwrap();
    assert_eq!(outcome, EditOutcome::Applied(EffectFlags::STRUCTURE));
    assert_eq!(editor.chart().events(move_x()).unwrap().len(), before);
    assert_eq!(editor.chart().value_at(move_x(), beat(4)).unwrap(), 7.0);

    editor.undo().unwrap();
    assert_eq!(editor.chart().value_at(move_x(), beat(4)).unwrap(), 100.0);
    assert_eq!(editor.chart().events(move_x()).unwrap().len(), before);
}

#[test]
fn ineffective_edit_reports_noop() {
    let mut editor = load();
    let outcome = editor.insert_boundary(move_x(), beat(4), 100.0, 100.0).unwrap();
    assert_eq!(outcome, EditOutcome::NoOp);
    assert!(!editor.edit_state().can_undo);
}

#[test]
fn tempo_edits_raise_every_flag() {
    let mut editor = load();
    let outcome = editor.set_bpm(beat(12), 120.0).unwrap();
    assert_eq!(outcome, EditOutcome::Applied(EffectFlags::ALL));
    assert!((editor.chart().seconds_at(beat(16)) - 8.0).abs() < 1e-12);
    assert_eq!(editor.undo().unwrap(), EditOutcome::Undone(EffectFlags::ALL));
    assert!((editor.chart().seconds_at(beat(16)) - 6.0).abs() < 1e-12);
}

#[test]
fn remove_and_retime_tempo_round_trip() {
    let mut editor = load();
    let second = editor.chart().bpm().list().tail_start().index();
    editor.retime_tempo(second, beat(12)).unwrap();
    // 12 beats at 120 + 4 at 240
    assert!((editor.chart().seconds_at(beat(16)) - 7.0).abs() < 1e-12);
    editor.remove_tempo(second).unwrap();
    assert!((editor.chart().seconds_at(beat(16)) - 8.0).abs() < 1e-12);

    editor.undo().unwrap();
    editor.undo().unwrap();
    assert!((editor.chart().seconds_at(beat(16)) - 6.0).abs() < 1e-12);
    editor.redo().unwrap();
    assert!((editor.chart().seconds_at(beat(16)) - 7.0).abs() < 1e-12);
}

#[test]
fn composite_of_structure_and_value_reverts_as_one() {
    let mut editor = load();
    let chart: &Chart = editor.chart();
    let start = chart.events(move_x()).unwrap().tail_start();
    let ops = vec![
        Operation::retime_boundary(chart, move_x(), start, beat(10)).unwrap(),
        Operation::set_value(chart, move_x(), start, 0.0).unwrap(),
    ];
    let outcome = editor.apply(Operation::composite(ops)).unwrap();
    assert_eq!(outcome, EditOutcome::Applied(EffectFlags::STRUCTURE));
    assert_eq!(editor.chart().value_at(move_x(), beat(12)).unwrap(), 0.0);

    editor.undo().unwrap();
    assert_eq!(editor.chart().value_at(move_x(), beat(8)).unwrap(), 50.0);
    assert_eq!(editor.chart().value_at(move_x(), beat(6)).unwrap(), 75.0);
}

#[test]
fn export_after_edits_reloads_identically() {
    let mut editor = load();
    editor.insert_boundary(move_x(), beat(2), 10.0, 20.0).unwrap();
    editor.rename_line(0, "renamed").unwrap();
    let json = editor.to_json().unwrap();

    let reloaded = ChartEditor::from_json(&json, EngineConfig::default()).unwrap();
    assert_eq!(reloaded.chart().to_data(), editor.chart().to_data());
    assert_eq!(reloaded.chart().line(0).unwrap().name, "renamed");
    let alpha = EventTarget::new(0, EventChannel::Alpha);
    for q in 0..64 {
        let b = RationalTime::new(0, q, 4).unwrap();
        assert_eq!(
            reloaded.chart().value_at(alpha, b).unwrap(),
            editor.chart().value_at(alpha, b).unwrap()
        );
    }
}

#[test]
fn tempo_boundary_cannot_land_on_a_neighbouring_segment() {
    let mut editor = ChartEditor::new(Chart::new(beat(16), 120.0).unwrap());
    editor.insert_tempo(beat(8), 240.0).unwrap();
    let second = editor.chart().bpm().list().tail_start().index();
    let before = editor.edit_state();

    let err = editor.retime_tempo(second, beat(0)).unwrap_err();
    assert!(matches!(err, ChartError::Structural(_)));
    assert_eq!(editor.edit_state(), before);

    editor.insert_tempo(beat(12), 60.0).unwrap();
    assert!(editor.retime_tempo(second, beat(12)).is_err());
    editor.retime_tempo(second, beat(10)).unwrap();

    let reloaded = ChartEditor::from_json(&editor.to_json().unwrap(), EngineConfig::default()).unwrap();
    assert_eq!(reloaded.chart().bpm().segments(), editor.chart().bpm().segments());
    assert!((reloaded.chart().seconds_at(beat(16)) - editor.chart().seconds_at(beat(16))).abs() < 1e-12);
}

#[test]
fn undo_limit_comes_from_config() {
    let config = EngineConfig::from_json(r#"{"undoLimit": 2}"#).unwrap();
    let mut editor = ChartEditor::from_json(CHART, config).unwrap();
    for w in 9..14 {
        editor.insert_boundary(move_x(), beat(w), 1.0, 1.0).unwrap();
    }
    assert_eq!(editor.edit_state().undo_count, 2);
}
