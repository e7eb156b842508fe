use pkdb_model::MeasurementKind;
use pkdb_standards::load_default_standards;
use pkdb_units::UnitRegistry;

#[test]
fn loads_workspace_standards() {
    let registry = load_default_standards().expect("load standards");
    assert!(!registry.canonical.is_empty());
    assert_eq!(registry.canonical.time_unit().unwrap().symbol(), "h");
    let concentration = registry
        .canonical
        .canonical_unit(MeasurementKind::Output, "concentration")
        .unwrap();
    assert_eq!(concentration.symbol(), "µg/ml");
}

#[test]
fn configured_units_match_builtin_registry() {
    let registry = load_default_standards().expect("load standards");
    let builtin = UnitRegistry::builtin();
    assert_eq!(registry.units.atoms().len(), builtin.atoms().len());
    for unit in ["mg*h/l", "µmol/l", "ml/min/kg", "mmHg", "kg/m^2", "IU/l", "%"] {
        let configured = registry.units.parse_unit(unit).unwrap();
        let reference = builtin.parse_unit(unit).unwrap();
        assert!(configured.is_equivalent(&reference), "{unit}");
    }
}

#[test]
fn dosing_has_per_bodyweight_variant() {
    let registry = load_default_standards().expect("load standards");
    let per_kg = registry.units.parse_unit("µg/kg").unwrap();
    let canonical = registry
        .canonical
        .canonical_unit_for(MeasurementKind::Intervention, "dosing", &per_kg)
        .unwrap();
    assert_eq!(canonical.symbol(), "mg/kg");
}
