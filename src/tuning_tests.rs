use std::thread;

use super::*;

fn create_gains() -> GainSet {
    GainSet::new(0.1, 0.01, 0.001, 0.0, 0.3, 0.0, -0.8, 0.9).unwrap()
}

fn initialized_tuner(
    transport: &mut ChannelTuningTransport,
    gains: &mut GainSet,
) -> GainTuner {
    let mut tuner = GainTuner::new("Drivetrain/Drive");
    assert!(!tuner.periodic(transport, gains));
    tuner
}

// SlotValue

#[test]
fn test_slot_value_conversions() {
    assert_eq!(SlotValue::from(true), SlotValue::Bool(true));
    assert_eq!(SlotValue::from(0.5), SlotValue::Number(0.5));

    assert_eq!(bool::try_from(SlotValue::Bool(false)), Ok(false));
    assert_eq!(
        bool::try_from(SlotValue::Number(1.0)),
        Err(SlotValue::Number(1.0))
    );

    assert_eq!(f64::try_from(SlotValue::Number(2.5)), Ok(2.5));
    assert!(f64::try_from(SlotValue::Number(f64::NAN)).is_err());
    assert_eq!(
        f64::try_from(SlotValue::Bool(true)),
        Err(SlotValue::Bool(true))
    );
}

// ChannelTuningTransport

#[test]
fn when_editing_a_slot_should_only_be_visible_after_poll() {
    let mut transport = ChannelTuningTransport::new();
    transport.publish("a", SlotValue::Number(1.0));
    let editor = transport.editor();

    editor.set_number("a", 2.0).unwrap();
    assert_eq!(transport.read("a"), Some(SlotValue::Number(1.0)));

    transport.poll();
    assert_eq!(transport.read("a"), Some(SlotValue::Number(2.0)));
}

#[test]
fn when_editing_from_another_thread_should_apply_edits_in_order() {
    let mut transport = ChannelTuningTransport::new();
    let editor = transport.editor();

    let handle = thread::spawn(move || {
        editor.set_bool("flag", true).unwrap();
        editor.set_number("value", 1.0).unwrap();
        editor.set_number("value", 3.0).unwrap();
    });
    handle.join().unwrap();

    transport.poll();

    assert_eq!(transport.read("flag"), Some(SlotValue::Bool(true)));
    assert_eq!(transport.read("value"), Some(SlotValue::Number(3.0)));
    assert_eq!(transport.keys(), vec!["flag", "value"]);
}

#[test]
fn when_the_transport_is_gone_editing_should_error() {
    let transport = ChannelTuningTransport::new();
    let editor = transport.editor();
    drop(transport);

    assert_eq!(
        editor.set_number("Drivetrain/Drive/kP", 1.0),
        Err(Error::FailedToSendTuningEdit {
            key: "Drivetrain/Drive/kP".to_string()
        })
    );
}

#[test]
fn when_reading_a_missing_slot_should_return_none() {
    let transport = ChannelTuningTransport::default();

    assert_eq!(transport.read("missing"), None);
}

// GainTuner

#[test]
fn when_activated_should_publish_the_tracked_gains() {
    let mut transport = ChannelTuningTransport::new();
    let mut gains = create_gains();

    initialized_tuner(&mut transport, &mut gains);

    assert_eq!(
        transport.keys(),
        vec![
            "Drivetrain/Drive/kD",
            "Drivetrain/Drive/kI",
            "Drivetrain/Drive/kMax",
            "Drivetrain/Drive/kMin",
            "Drivetrain/Drive/kP",
            "Drivetrain/Drive/kV",
        ]
    );
    assert_eq!(
        transport.read("Drivetrain/Drive/kP"),
        Some(SlotValue::Number(0.1))
    );
    assert_eq!(
        transport.read("Drivetrain/Drive/kMin"),
        Some(SlotValue::Number(-0.8))
    );
    assert!(!gains.is_dirty());
}

#[test]
fn when_slots_are_unchanged_should_not_mark_dirty() {
    let mut transport = ChannelTuningTransport::new();
    let mut gains = create_gains();
    let mut tuner = initialized_tuner(&mut transport, &mut gains);

    transport.poll();
    let changed = tuner.periodic(&mut transport, &mut gains);

    assert!(!changed);
    assert!(!gains.is_dirty());
}

#[test]
fn when_a_slot_is_edited_should_write_the_value_and_mark_dirty() {
    let mut transport = ChannelTuningTransport::new();
    let mut gains = create_gains();
    let mut tuner = initialized_tuner(&mut transport, &mut gains);

    transport
        .editor()
        .set_number("Drivetrain/Drive/kP", 0.25)
        .unwrap();
    transport.poll();
    let changed = tuner.periodic(&mut transport, &mut gains);

    assert!(changed);
    assert!(gains.is_dirty());
    assert_eq!(gains.get(GainField::P), 0.25);
}

#[test]
fn when_gains_are_dirty_the_tuner_should_not_clear_the_flag() {
    let mut transport = ChannelTuningTransport::new();
    let mut gains = create_gains();
    let mut tuner = initialized_tuner(&mut transport, &mut gains);
    transport
        .editor()
        .set_number("Drivetrain/Drive/kV", 0.5)
        .unwrap();
    transport.poll();
    tuner.periodic(&mut transport, &mut gains);

    let changed = tuner.periodic(&mut transport, &mut gains);

    assert!(!changed);
    assert!(gains.is_dirty());
}

#[test]
fn when_shifting_the_output_range_past_its_bounds_should_accept_both_limits() {
    let mut transport = ChannelTuningTransport::new();
    let mut gains = create_gains();
    let mut tuner = initialized_tuner(&mut transport, &mut gains);

    let editor = transport.editor();
    editor.set_number("Drivetrain/Drive/kMin", 1.0).unwrap();
    editor.set_number("Drivetrain/Drive/kMax", 2.0).unwrap();
    transport.poll();
    tuner.periodic(&mut transport, &mut gains);

    assert_eq!(gains.get(GainField::OutputMin), 1.0);
    assert_eq!(gains.get(GainField::OutputMax), 2.0);
    assert!(gains.is_dirty());
}

#[test]
fn when_an_inverted_output_range_is_edited_should_reject_and_restore_the_slots() {
    let mut transport = ChannelTuningTransport::new();
    let mut gains = create_gains();
    let mut tuner = initialized_tuner(&mut transport, &mut gains);

    transport
        .editor()
        .set_number("Drivetrain/Drive/kMin", 1.0)
        .unwrap();
    transport.poll();
    let changed = tuner.periodic(&mut transport, &mut gains);

    assert!(!changed);
    assert!(!gains.is_dirty());
    assert_eq!(gains.get(GainField::OutputMin), -0.8);
    assert_eq!(
        transport.read("Drivetrain/Drive/kMin"),
        Some(SlotValue::Number(-0.8))
    );
}

#[test]
fn when_a_non_finite_value_is_edited_should_reject_and_restore_the_slot() {
    let mut transport = ChannelTuningTransport::new();
    let mut gains = create_gains();
    let mut tuner = initialized_tuner(&mut transport, &mut gains);

    let editor = transport.editor();
    editor.set_number("Drivetrain/Drive/kI", f64::INFINITY).unwrap();
    editor.set_bool("Drivetrain/Drive/kD", true).unwrap();
    transport.poll();
    let changed = tuner.periodic(&mut transport, &mut gains);

    assert!(!changed);
    assert_eq!(gains.get(GainField::I), 0.01);
    assert_eq!(
        transport.read("Drivetrain/Drive/kI"),
        Some(SlotValue::Number(0.01))
    );
    assert_eq!(
        transport.read("Drivetrain/Drive/kD"),
        Some(SlotValue::Number(0.001))
    );
}

#[test]
fn test_gain_tuner_key() {
    let tuner = GainTuner::new("Drivetrain/Steer");

    assert_eq!(tuner.key(GainField::P), "Drivetrain/Steer/kP");
    assert_eq!(tuner.key(GainField::OutputMax), "Drivetrain/Steer/kMax");
}
