use eskd_core::prelude::*;
use eskd_core::entities::axis::AxisMarkersPosition;
use eskd_file::{load_settings, save_settings, DataDir, XmlStyleRepository};
use std::fs;
use tempfile::TempDir;

fn repository() -> (TempDir, XmlStyleRepository) {
    let dir = TempDir::new().unwrap();
    let data = DataDir::new(dir.path());
    let repo = XmlStyleRepository::new(data.styles_dir());
    (dir, repo)
}

fn write_axis_file(repo: &XmlStyleRepository, body: &str) {
    fs::create_dir_all(repo.dir()).unwrap();
    let xml = format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Styles>\n{}\n</Styles>", body);
    fs::write(repo.path(EntityKind::Axis), xml).unwrap();
}

#[test]
fn test_missing_file_loads_no_user_styles() {
    let (_dir, repo) = repository();
    let loc = BuiltinLocalizer::english();
    let mut store = StyleStore::new(&loc);
    assert_eq!(store.load_from(EntityKind::Axis, &repo, &loc).unwrap(), 0);
    assert_eq!(store.styles(EntityKind::Axis).count(), 1);
}

#[test]
fn test_missing_property_gets_default() {
    let (_dir, repo) = repository();
    write_axis_file(
        &repo,
        r#"<UserStyle Name="Old" Description="" Guid="6f1f7c1e-2b7a-4a0e-8d6f-2f0c9a1b3c4d">
             <Property Name="Fracture" Value="8"/>
           </UserStyle>"#,
    );
    let loc = BuiltinLocalizer::english();
    let mut store = StyleStore::new(&loc);
    store.load_from(EntityKind::Axis, &repo, &loc).unwrap();

    let style = store.find_by_name(EntityKind::Axis, "Old").unwrap();
    assert_eq!(style.value("Fracture"), Some(&PropertyValue::Int(8)));
    assert_eq!(
        style.value("MarkersPosition"),
        Some(&PropertyValue::from(AxisMarkersPosition::Bottom))
    );
    assert_eq!(style.value("MarkersDiameter"), Some(&PropertyValue::Int(10)));
}

#[test]
fn test_unparsable_value_falls_back_to_default() {
    let (_dir, repo) = repository();
    write_axis_file(
        &repo,
        r#"<UserStyle Name="Broken" Description="" Guid="6f1f7c1e-2b7a-4a0e-8d6f-2f0c9a1b3c4d">
             <Property Name="Fracture" Value="oops"/>
             <Property Name="MarkersCount" Value="3"/>
           </UserStyle>"#,
    );
    let loc = BuiltinLocalizer::english();
    let mut store = StyleStore::new(&loc);
    store.load_from(EntityKind::Axis, &repo, &loc).unwrap();

    let style = store.find_by_name(EntityKind::Axis, "Broken").unwrap();
    assert_eq!(style.value("Fracture"), Some(&PropertyValue::Int(5)));
    assert_eq!(style.value("MarkersCount"), Some(&PropertyValue::Int(3)));
}

#[test]
fn test_style_without_guid_gets_one() {
    let (_dir, repo) = repository();
    write_axis_file(
        &repo,
        r#"<UserStyle Name="Anonymous" Description=""/>
<UserStyle Name="Zeroed" Description="" Guid="00000000-0000-0000-0000-000000000000"/>"#,
    );
    let loc = BuiltinLocalizer::english();
    let mut store = StyleStore::new(&loc);
    assert_eq!(store.load_from(EntityKind::Axis, &repo, &loc).unwrap(), 2);

    let style = store.find_by_name(EntityKind::Axis, "Anonymous").unwrap();
    assert!(!style.guid.is_nil());
    assert_eq!(style.style_type, StyleType::User);

    // 全零 guid 属于系统样式，用户样式改用新的 guid
    let zeroed = store.find_by_name(EntityKind::Axis, "Zeroed").unwrap();
    assert!(!zeroed.guid.is_nil());
    assert_eq!(zeroed.style_type, StyleType::User);
    let guid = zeroed.guid;
    store.rename(EntityKind::Axis, guid, "Renamed").unwrap();
    assert!(store.find(EntityKind::Axis, uuid::Uuid::nil()).unwrap().is_system());
}

#[test]
fn test_saved_styles_reload_with_side_data() {
    let (_dir, repo) = repository();
    let loc = BuiltinLocalizer::english();
    let mut store = StyleStore::new(&loc);

    let guid = store.create(EntityKind::GroundLine, "Wide", &loc);
    {
        let style = store.style_mut(EntityKind::GroundLine, guid).unwrap();
        style.set_value("Space", PropertyValue::Int(15)).unwrap();
        style.layer = Some(Layer::new("Ground").with_color(Color::RED).with_line_type("DASHED"));
        style.text_style = Some(TextStyle::new("Narrow"));
    }
    store.save_to(EntityKind::GroundLine, &repo).unwrap();

    let mut reloaded = StyleStore::new(&loc);
    assert_eq!(reloaded.load_from(EntityKind::GroundLine, &repo, &loc).unwrap(), 1);
    let style = reloaded.find(EntityKind::GroundLine, guid).unwrap();
    assert_eq!(style.name, "Wide");
    assert_eq!(style.value("Space"), Some(&PropertyValue::Int(15)));

    let layer = style.layer.as_ref().unwrap();
    assert_eq!(layer.name, "Ground");
    assert_eq!(layer.color, Color::RED);
    assert_eq!(layer.line_type, "DASHED");
    assert_eq!(style.text_style.as_ref().map(|t| t.name.as_str()), Some("Narrow"));
}

#[test]
fn test_duplicate_names_block_saving() {
    let (_dir, repo) = repository();
    let loc = BuiltinLocalizer::english();
    let mut store = StyleStore::new(&loc);
    store.create(EntityKind::BreakLine, "Same", &loc);
    store.create(EntityKind::BreakLine, "Same", &loc);

    let err = store.save_to(EntityKind::BreakLine, &repo).unwrap_err();
    assert!(matches!(err, StyleError::DuplicateNames { .. }));
    assert!(!repo.path(EntityKind::BreakLine).exists());
}

#[test]
fn test_settings_round_trip() {
    let dir = TempDir::new().unwrap();
    let data = DataDir::new(dir.path().join("nested"));

    let mut settings = load_settings(&data.settings_path()).unwrap();
    assert_eq!(settings, UserSettings::default());

    settings.max_selected_objects = 250;
    settings.use_scale_from_style = true;
    settings.set_current_style(EntityKind::Axis, uuid::Uuid::new_v4());
    save_settings(&data.settings_path(), &settings).unwrap();

    assert_eq!(load_settings(&data.settings_path()).unwrap(), settings);
}

#[test]
fn test_partial_settings_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{ "max_selected_objects": 5 }"#).unwrap();

    let settings = load_settings(&path).unwrap();
    assert_eq!(settings.max_selected_objects, 5);
    assert!(settings.use_layer_from_style);
}
