use super::*;
use crate::tuning::ChannelTuningTransport;

fn initialized_options(transport: &mut ChannelTuningTransport) -> DriveOptions {
    let mut options = DriveOptions::new("Drivetrain", DriveOptionValues::default());
    options.periodic(transport);
    options
}

// LiveOption

#[test]
fn when_creating_option_should_be_clean() {
    let option = LiveOption::new("Drivetrain/Options/Allow Rotation".to_string(), true);

    assert_eq!(option.key(), "Drivetrain/Options/Allow Rotation");
    assert!(option.value());
    assert!(!option.is_dirty());
}

#[test]
fn when_ingesting_a_changed_slot_should_mark_dirty_for_one_ingest() {
    let mut transport = ChannelTuningTransport::new();
    let mut option = LiveOption::new("scale".to_string(), 1.0);
    option.publish(&mut transport);

    transport.editor().set_number("scale", 0.5).unwrap();
    transport.poll();

    assert!(option.ingest(&mut transport));
    assert!(option.is_dirty());
    assert_eq!(option.value(), 0.5);

    assert!(!option.ingest(&mut transport));
    assert!(!option.is_dirty());
}

#[test]
fn when_ingesting_a_slot_of_the_wrong_kind_should_restore_the_slot() {
    let mut transport = ChannelTuningTransport::new();
    let mut option = LiveOption::new("flag".to_string(), false);
    option.publish(&mut transport);

    transport.editor().set_number("flag", 1.0).unwrap();
    transport.poll();

    assert!(!option.ingest(&mut transport));
    assert!(!option.value());
    assert_eq!(transport.read("flag"), Some(SlotValue::Bool(false)));
}

#[test]
fn when_ingesting_a_missing_slot_should_publish_the_value() {
    let mut transport = ChannelTuningTransport::new();
    let mut option = LiveOption::new("scale".to_string(), 0.75);

    assert!(!option.ingest(&mut transport));
    assert_eq!(transport.read("scale"), Some(SlotValue::Number(0.75)));
}

#[test]
fn when_ingesting_a_non_finite_number_should_keep_the_value() {
    let mut transport = ChannelTuningTransport::new();
    let mut option = LiveOption::new("scale".to_string(), 0.75);
    option.publish(&mut transport);

    transport.editor().set_number("scale", f64::NAN).unwrap();
    transport.poll();

    assert!(!option.ingest(&mut transport));
    assert_eq!(option.value(), 0.75);
}

// DriveOptions

#[test]
fn test_default_values() {
    let values = DriveOptionValues::default();

    assert!(values.allow_rotation);
    assert!(values.angle_optimize);
    assert!(values.cosine_optimize);
    assert_eq!(values.drive_speed_scale, 1.0);
    assert!(values.field_relative);
}

#[test]
fn when_activated_should_publish_all_options() {
    let mut transport = ChannelTuningTransport::new();

    let options = initialized_options(&mut transport);

    assert_eq!(
        transport.keys(),
        vec![
            "Drivetrain/Options/Allow Rotation",
            "Drivetrain/Options/Angle Optimize",
            "Drivetrain/Options/Cosine Optimize",
            "Drivetrain/Options/Drive Speed Scale",
            "Drivetrain/Options/Field Relative",
        ]
    );
    assert_eq!(options.values(), DriveOptionValues::default());
    assert!(!options.is_dirty());
}

#[test]
fn when_an_option_is_edited_should_change_only_that_option() {
    let mut transport = ChannelTuningTransport::new();
    let mut options = initialized_options(&mut transport);

    transport
        .editor()
        .set_bool("Drivetrain/Options/Cosine Optimize", false)
        .unwrap();
    transport.poll();
    let values = options.periodic(&mut transport);

    assert_eq!(
        values,
        DriveOptionValues {
            cosine_optimize: false,
            ..DriveOptionValues::default()
        }
    );
    assert!(options.is_dirty());
    assert!(options.cosine_optimize().is_dirty());
    assert!(!options.angle_optimize().is_dirty());

    options.periodic(&mut transport);
    assert!(!options.is_dirty());
}

#[test]
fn when_created_with_values_should_use_them() {
    let defaults = DriveOptionValues {
        allow_rotation: false,
        angle_optimize: false,
        cosine_optimize: true,
        drive_speed_scale: 0.4,
        field_relative: false,
    };

    let options = DriveOptions::new("Robot", defaults);

    assert_eq!(options.values(), defaults);
    assert_eq!(options.allow_rotation().key(), "Robot/Options/Allow Rotation");
    assert_eq!(options.drive_speed_scale().value(), 0.4);
    assert!(!options.field_relative().value());
}

#[test]
fn when_deserializing_values_should_fill_in_defaults() {
    let values: DriveOptionValues = serde_yaml::from_str("allow_rotation: false\n").unwrap();

    assert_eq!(
        values,
        DriveOptionValues {
            allow_rotation: false,
            ..DriveOptionValues::default()
        }
    );
}
