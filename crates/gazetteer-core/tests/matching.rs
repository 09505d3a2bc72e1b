//! End-to-end matching over definition files written into temp directories.

use std::collections::BTreeSet;
use std::fs;
use std::sync::{Arc, Mutex};

use gazetteer_core::{
    Document, EntrySyntax, Gazetteer, GazetteerConfig, GazetteerError, GazetteerEvent,
    MatchStrategy,
};
use gazetteer_lists::ListEntryDescriptor;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(definition: &str, lists: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lists.def"), definition).unwrap();
        for (name, content) in lists {
            fs::write(dir.path().join(name), content).unwrap();
        }
        Self { dir }
    }

    fn config(&self) -> GazetteerConfig {
        GazetteerConfig::with_lists(self.dir.path().join("lists.def").to_string_lossy())
    }

    fn engine(&self, tweak: impl FnOnce(&mut GazetteerConfig)) -> Gazetteer {
        let mut config = self.config();
        tweak(&mut config);
        let mut engine = Gazetteer::new(config);
        engine.init().unwrap();
        engine
    }
}

fn spans(doc: &Document) -> Vec<(String, String)> {
    doc.annotations()
        .sorted()
        .into_iter()
        .map(|a| (a.annotation_type.clone(), doc.text()[a.start..a.end].to_string()))
        .collect()
}

fn greetings() -> Fixture {
    Fixture::new(
        "greetings.lst:greeting::es\nwords.lst:word\n",
        &[("greetings.lst", "buenos días\n"), ("words.lst", "buenos\n")],
    )
}

#[test]
fn longest_match_suppresses_shorter_same_type() {
    let fixture = greetings();
    let engine = fixture.engine(|_| {});

    let mut doc = Document::new("buenos días");
    engine.execute(&mut doc).unwrap();
    assert_eq!(spans(&doc), vec![("Lookup".into(), "buenos días".into())]);
}

#[test]
fn longer_later_match_replaces_shorter_earlier_one() {
    let fixture = Fixture::new(
        "words.lst:word\ngreetings.lst:greeting::es\n",
        &[("greetings.lst", "buenos días\n"), ("words.lst", "buenos\n")],
    );
    let engine = fixture.engine(|_| {});

    let mut doc = Document::new("buenos días");
    engine.execute(&mut doc).unwrap();
    let annotations = doc.annotations().sorted();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].features["majorType"], "greeting");
}

fn new_york_spans(definition: &str) -> Vec<(String, String)> {
    let fixture = Fixture::new(
        definition,
        &[
            ("both.lst", "new york\nyork city\nyork\n"),
            ("head.lst", "new york\n"),
            ("tail.lst", "york city\nyork\n"),
        ],
    );
    let engine = fixture.engine(|_| {});
    let mut doc = Document::new("new york city");
    engine.execute(&mut doc).unwrap();
    spans(&doc)
}

#[test]
fn partially_overlapping_matches_are_both_kept() {
    let expected = vec![
        ("Lookup".to_string(), "new york".to_string()),
        ("Lookup".to_string(), "york city".to_string()),
    ];
    assert_eq!(new_york_spans("both.lst:city\n"), expected);
    assert_eq!(new_york_spans("head.lst:city\ntail.lst:city\n"), expected);
    assert_eq!(new_york_spans("tail.lst:city\nhead.lst:city\n"), expected);
}

#[test]
fn many_matches_annotate_in_one_pass() {
    let fixture = Fixture::new("city.lst:location:city\n", &[("city.lst", "madrid\n")]);
    let engine = fixture.engine(|_| {});

    let mut doc = Document::new("madrid ".repeat(20_000));
    assert_eq!(engine.execute(&mut doc).unwrap(), 20_000);
    assert_eq!(doc.annotations().len(), 20_000);
}

#[test]
fn all_matches_kept_without_longest_match() {
    let fixture = greetings();
    let engine = fixture.engine(|c| c.longest_match_only = false);

    let mut doc = Document::new("buenos días");
    engine.execute(&mut doc).unwrap();
    assert_eq!(
        spans(&doc),
        vec![
            ("Lookup".into(), "buenos días".into()),
            ("Lookup".into(), "buenos".into())
        ]
    );
}

#[test]
fn string_and_entry_features_follow_toggles() {
    let fixture = Fixture::new("city.lst:location:city\n", &[("city.lst", "madrid\n")]);

    let mut engine = fixture.engine(|_| {});
    let mut doc = Document::new("de madrid a sevilla");
    engine.execute(&mut doc).unwrap();
    let ann = doc.annotations().iter().next().unwrap().clone();
    assert_eq!(ann.features["string"], "madrid");
    assert_eq!(ann.features["gazEntry"], "madrid");
    assert_eq!(ann.features["majorType"], "location");
    assert_eq!(ann.features["minorType"], "city");

    engine.set_add_string_feature(false);
    engine.set_add_entry_feature(false);
    let mut doc = Document::new("de madrid a sevilla");
    engine.execute(&mut doc).unwrap();
    let ann = doc.annotations().iter().next().unwrap();
    assert!(!ann.features.contains_key("string"));
    assert!(!ann.features.contains_key("gazEntry"));
}

#[test]
fn annotation_types_are_partitioned() {
    let fixture = Fixture::new(
        "city.lst:location:city::City\nwords.lst:word\n",
        &[("city.lst", "madrid\n"), ("words.lst", "hola\nmadrid\n")],
    );
    let engine = fixture.engine(|_| {});

    let mut doc = Document::new("hola madrid");
    engine.execute(&mut doc).unwrap();
    assert_eq!(doc.annotations().types(), BTreeSet::from(["City", "Lookup"]));
    // Different types never suppress each other.
    assert_eq!(doc.annotations().len(), 3);
}

#[test]
fn inline_features_use_configured_separator() {
    let fixture = Fixture::new(
        "city.lst:location:city\n",
        &[("city.lst", "madrid@country=ES@capital\n")],
    );
    let engine = fixture.engine(|c| c.feature_separator = "@".to_string());

    let mut doc = Document::new("madrid");
    engine.execute(&mut doc).unwrap();
    let ann = doc.annotations().iter().next().unwrap();
    assert_eq!(ann.features["country"], "ES");
    assert_eq!(ann.features["capital"], "");
    assert_eq!(ann.features["gazEntry"], "madrid");
}

#[test]
fn named_annotation_set_is_used() {
    let fixture = Fixture::new("city.lst:location:city\n", &[("city.lst", "madrid\n")]);
    let engine = fixture.engine(|c| c.annotation_set_name = Some("gazetteer".to_string()));

    let mut doc = Document::new("madrid");
    engine.execute(&mut doc).unwrap();
    assert!(doc.annotations().is_empty());
    assert_eq!(doc.named("gazetteer").map(|set| set.len()), Some(1));
}

#[test]
fn boundaries_depend_on_letter_edges() {
    let fixture = Fixture::new(
        "places.lst:location\nabbrev.lst:abbreviation\n",
        &[("places.lst", "york\n"), ("abbrev.lst", "U.S.\n")],
    );
    let engine = fixture.engine(|_| {});

    let mut doc = Document::new("yorkshire, york and the U.S.A");
    engine.execute(&mut doc).unwrap();
    let texts: Vec<_> = spans(&doc).into_iter().map(|(_, text)| text).collect();
    assert_eq!(texts, vec!["york", "U.S."]);
}

#[test]
fn duplicate_matches_fresh_build() {
    let fixture = Fixture::new(
        "greetings.lst:greeting::es\nwords.lst:word\ncity.lst:location:city::City\n",
        &[
            ("greetings.lst", "buenos días\nbuenas noches\n"),
            ("words.lst", "buenos\nnoches\nmadrid\n"),
            ("city.lst", "madrid\nnew york\n"),
        ],
    );
    let text = "buenos días, buenas noches desde madrid y new york";

    let fresh = fixture.engine(|_| {});
    let original = fixture.engine(|_| {});
    let copy = original.duplicate().unwrap();
    assert!(copy.state().is_shared());
    assert!(Arc::ptr_eq(
        copy.dictionary().unwrap(),
        original.dictionary().unwrap()
    ));

    let mut expected = Document::new(text);
    fresh.execute(&mut expected).unwrap();
    let mut actual = Document::new(text);
    copy.execute(&mut actual).unwrap();

    assert_eq!(actual.annotations().sorted(), expected.annotations().sorted());
}

#[test]
fn duplicates_annotate_concurrently() {
    let fixture = Fixture::new("city.lst:location:city\n", &[("city.lst", "madrid\nparis\n")]);
    let engine = fixture.engine(|_| {});

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let worker = engine.duplicate().unwrap();
            std::thread::spawn(move || {
                let mut doc = Document::new(format!("{i}: madrid, paris, madrid"));
                worker.execute(&mut doc).unwrap();
                doc.annotations().len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
}

#[test]
fn missing_definition_is_a_build_error() {
    let mut engine = Gazetteer::new(GazetteerConfig::with_lists("/no/such/dir/lists.def"));
    assert!(matches!(engine.init(), Err(GazetteerError::Lists(_))));
    assert!(!engine.is_built());
}

#[test]
fn failed_rebuild_keeps_previous_dictionary() {
    let fixture = Fixture::new("city.lst:location:city\n", &[("city.lst", "madrid\n")]);
    let mut engine = fixture.engine(|_| {});

    fs::write(fixture.dir.path().join("lists.def"), "gone.lst:x\n").unwrap();
    assert!(engine.reinit().is_err());

    let mut doc = Document::new("madrid");
    engine.execute(&mut doc).unwrap();
    assert_eq!(doc.annotations().len(), 1);
}

#[test]
fn reinit_picks_up_changes_and_notifies() {
    let fixture = Fixture::new("city.lst:location:city\n", &[("city.lst", "madrid\n")]);
    let mut engine = fixture.engine(|_| {});
    let early = engine.duplicate().unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let id = engine.add_listener(move |event| sink.lock().unwrap().push(event.clone()));

    fs::write(fixture.dir.path().join("city.lst"), "madrid\nparis\n").unwrap();
    engine.reinit().unwrap();
    assert_eq!(
        *events.lock().unwrap(),
        vec![GazetteerEvent::Reinit { lists: 1, entries: 2 }]
    );

    let mut doc = Document::new("paris");
    engine.execute(&mut doc).unwrap();
    assert_eq!(doc.annotations().len(), 1);

    // Duplicates keep the dictionary they were created with.
    let mut doc = Document::new("paris");
    early.execute(&mut doc).unwrap();
    assert!(doc.annotations().is_empty());

    assert!(engine.remove_listener(id));
    engine.reinit().unwrap();
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn add_list_extends_owned_dictionary() {
    let fixture = Fixture::new(
        "city.lst:location:city\n",
        &[("city.lst", "madrid\n"), ("river.lst", "tajo\n")],
    );
    let mut engine = fixture.engine(|_| {});

    assert!(engine.add_list(ListEntryDescriptor::new("river.lst", "river")).unwrap());
    assert!(!engine.add_list(ListEntryDescriptor::new("city.lst", "again")).unwrap());

    let mut doc = Document::new("el tajo en madrid");
    engine.execute(&mut doc).unwrap();
    assert_eq!(doc.annotations().len(), 2);
    assert!(engine.dictionary().unwrap().definition().is_modified());
}

#[test]
fn automaton_strategy_folds_whitespace() {
    let fixture = greetings();
    let engine = fixture.engine(|c| c.match_strategy = MatchStrategy::Automaton);

    let mut doc = Document::new("¡buenos   días!");
    engine.execute(&mut doc).unwrap();
    let annotations = doc.annotations().sorted();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].features["string"], "buenos   días");
    assert_eq!(annotations[0].features["gazEntry"], "buenos días");

    let literal = fixture.engine(|_| {});
    let mut doc = Document::new("¡buenos   días!");
    literal.execute(&mut doc).unwrap();
    assert_eq!(spans(&doc), vec![("Lookup".into(), "buenos".into())]);
}

#[test]
fn strategies_agree_on_simple_text() {
    let fixture = Fixture::new(
        "city.lst:location:city::City\nwords.lst:word\n",
        &[("city.lst", "madrid\nnew york\n"), ("words.lst", "new\nyork\nhola\n")],
    );
    let text = "hola, new york y madrid";

    let by_pattern = fixture.engine(|_| {});
    let by_automaton = fixture.engine(|c| c.match_strategy = MatchStrategy::Automaton);

    let mut a = Document::new(text);
    by_pattern.execute(&mut a).unwrap();
    let mut b = Document::new(text);
    by_automaton.execute(&mut b).unwrap();
    assert_eq!(spans(&a), spans(&b));
}

#[test]
fn strategies_agree_on_entries_starting_with_space() {
    let fixture = Fixture::new("city.lst:location:city\n", &[("city.lst", " madrid\n")]);
    let text = "en madrid hoy";

    let mut by_pattern = Document::new(text);
    fixture.engine(|_| {}).execute(&mut by_pattern).unwrap();
    let mut by_automaton = Document::new(text);
    fixture
        .engine(|c| c.match_strategy = MatchStrategy::Automaton)
        .execute(&mut by_automaton)
        .unwrap();

    assert_eq!(spans(&by_pattern), vec![("Lookup".to_string(), " madrid".to_string())]);
    assert_eq!(spans(&by_pattern), spans(&by_automaton));
}

#[test]
fn pattern_entries() {
    let fixture = Fixture::new(
        "dates.lst:date\n",
        &[("dates.lst", "\\d{4}-\\d{2}-\\d{2}\ncolou?r\n")],
    );
    let engine = fixture.engine(|c| {
        c.entry_syntax = EntrySyntax::Pattern;
        c.feature_separator = String::new();
    });

    let mut doc = Document::new("on 2016-12-01 the colour and color");
    engine.execute(&mut doc).unwrap();
    let texts: Vec<_> = spans(&doc).into_iter().map(|(_, text)| text).collect();
    assert_eq!(texts, vec!["2016-12-01", "colour", "color"]);
    let first = doc.annotations().sorted()[0].clone();
    assert_eq!(first.features["gazEntry"], "\\d{4}-\\d{2}-\\d{2}");
}

#[test]
fn bad_pattern_aborts_build() {
    let fixture = Fixture::new("re.lst:x\n", &[("re.lst", "(open\n")]);
    let mut config = fixture.config();
    config.entry_syntax = EntrySyntax::Pattern;
    let mut engine = Gazetteer::new(config);
    assert!(matches!(engine.init(), Err(GazetteerError::Pattern { .. })));
    assert!(!engine.is_built());
}

#[test]
fn gml_export_of_built_dictionary() {
    let fixture = Fixture::new("city.lst:location:city\n", &[("city.lst", "ab\n")]);
    let engine = fixture.engine(|_| {});
    let gml = engine.dictionary().unwrap().automaton().to_gml();
    assert!(gml.contains("node[ id 2 label \"2,F\\n[location.city]\"  ]"));
    assert!(gml.contains("edge [ source 1 target 2 label \"'b'\" ]"));
}
