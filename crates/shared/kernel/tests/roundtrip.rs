use moraine_domain::value::{format_float, quote};
use moraine_kernel::{ParamRegistry, ParamsBuilder, ParamsError};
use proptest::prelude::*;

fn finite() -> impl Strategy<Value = f64> {
    prop::num::f64::NORMAL | prop::num::f64::ZERO | prop::num::f64::SUBNORMAL
}

/// A literal for a key the schema does not declare.
fn loose_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<bool>().prop_map(|b| if b { "True".to_owned() } else { "False".to_owned() }),
        any::<i64>().prop_map(|i| i.to_string()),
        finite().prop_map(format_float),
        (any::<i32>(), any::<i32>()).prop_map(|(a, b)| format!("{a}, {b}")),
        "[a-zA-Z0-9 ._/,#-]{0,12}".prop_map(|s| format!("'{s}'")),
        "[a-z \"#,]{0,12}".prop_map(|s| format!("'{s}'")),
        "[a-z '#,]{0,12}".prop_map(|s| format!("\"{s}\"")),
        Just(String::new()),
    ]
}

/// `dem_file` as a quoted literal, keeping `#`, `,` and quote characters.
fn path_literal(path: &str) -> String {
    quote(path).unwrap_or_default()
}

fn overrides() -> impl Strategy<Value = Vec<(String, String)>> {
    (
        any::<i64>(),
        finite(),
        any::<bool>(),
        (any::<i64>(), any::<i64>()),
        (finite(), finite()),
        prop::option::of("[a-z0-9_./~'\"#, -]{1,16}"),
        "[a-z0-9+]{1,8}",
        prop::collection::btree_map("x_[a-z_]{1,8}", loose_literal(), 0..6),
    )
        .prop_map(|(border, d1, rgi_area, window, bounds, dem, climate, loose)| {
            let mut out = vec![
                ("border".to_owned(), border.to_string()),
                ("d1".to_owned(), format_float(d1)),
                ("use_rgi_area".to_owned(), if rgi_area { "True" } else { "False" }.to_owned()),
                ("tstar_search_window".to_owned(), format!("{}, {}", window.0, window.1)),
                (
                    "temp_local_gradient_bounds".to_owned(),
                    format!("{}, {}", format_float(bounds.0), format_float(bounds.1)),
                ),
                ("dem_file".to_owned(), dem.map(|d| path_literal(&d)).unwrap_or_default()),
                ("baseline_climate".to_owned(), climate),
            ];
            out.extend(loose);
            out
        })
}

proptest! {
    #[test]
    fn load_serialize_load_keeps_every_value(sets in overrides()) {
        let mut builder = ParamsBuilder::new();
        for (key, literal) in &sets {
            builder = builder.set(key.clone(), literal.clone());
        }
        let first = builder.build().unwrap();

        let text = first.to_cfg_string().unwrap();
        let second = ParamRegistry::parse(&text).unwrap();

        prop_assert!(first.diff(&second).is_empty(), "changed: {:?}", first.diff(&second));
        prop_assert_eq!(first.len(), second.len());
        prop_assert_eq!(second.to_cfg_string().unwrap(), text);
    }

    #[test]
    fn any_int_literal_survives(value in any::<i64>()) {
        let params = ParamRegistry::parse(&format!("n = {value}\n")).unwrap();
        let again = ParamRegistry::parse(&params.to_cfg_string().unwrap()).unwrap();
        prop_assert_eq!(again.get_int("n").unwrap(), value);
    }
}

#[test]
fn bundled_defaults_roundtrip_byte_for_byte_in_values() {
    let defaults = ParamRegistry::defaults().unwrap();
    let reparsed = ParamRegistry::parse(&defaults.to_cfg_string().unwrap()).unwrap();
    assert!(defaults.diff(&reparsed).is_empty());
    assert_eq!(defaults.doc("border"), reparsed.doc("border"));
}

#[test]
fn mixed_quotes_before_a_comment_mark_survive() {
    let first = ParamRegistry::parse("dem_file = 'it's \"x\" #1'\n").unwrap();
    assert_eq!(first.get_str("dem_file").unwrap(), "it's \"x\" #1");

    let text = first.to_cfg_string().unwrap();
    let second = ParamRegistry::parse(&text).unwrap();
    assert!(first.diff(&second).is_empty(), "changed: {:?}", first.diff(&second));
}

#[test]
fn values_with_line_breaks_are_refused() {
    let params = ParamsBuilder::empty().set("note", "first\nsecond").build().unwrap();
    let err = params.to_cfg_string().unwrap_err();
    assert!(matches!(err, ParamsError::InvalidValue { ref key, .. } if key == "note"));
}
