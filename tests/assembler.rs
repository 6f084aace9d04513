use std::fs;
use std::path::PathBuf;

use cfb_dataset::stats_fetch::parse_team_game_stats_json;
use cfb_dataset::wide_table::{Cell, WideTable, WideTableAssembler};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn s(v: &str) -> Cell {
    Some(v.to_string())
}

fn no_stats() -> Vec<(&'static str, Cell)> {
    Vec::new()
}

fn assert_rectangular(table: &WideTable, rows: usize) {
    assert_eq!(table.row_count(), rows);
    for column in table.columns() {
        assert_eq!(column.values.len(), rows, "column {}", column.name);
    }
}

#[test]
fn every_column_tracks_row_count() {
    let mut asm = WideTableAssembler::new();
    assert_rectangular(asm.table(), 0);

    let games: Vec<(&str, Vec<(&str, Cell)>, Vec<(&str, Cell)>)> = vec![
        ("1", vec![("rushingTDs", s("2"))], vec![("rushingTDs", s("1"))]),
        ("2", vec![("passingTDs", s("3"))], vec![]),
        ("3", vec![], vec![("fumblesLost", s("1")), ("rushingTDs", s("0"))]),
        ("4", vec![("rushingTDs", None)], vec![("penalties", s("7-55"))]),
    ];
    for (n, (id, home, away)) in games.into_iter().enumerate() {
        asm.add_game(id, home, away);
        assert_rectangular(asm.table(), n + 1);
    }
}

#[test]
fn new_category_is_backfilled() {
    let mut asm = WideTableAssembler::new();
    asm.add_game("1", vec![("totalYards", s("300"))], vec![("totalYards", s("250"))]);
    asm.add_game("2", vec![("totalYards", s("410"))], vec![("totalYards", s("199"))]);
    asm.add_game(
        "3",
        vec![("totalYards", s("120")), ("kickReturns", s("4"))],
        no_stats(),
    );
    let table = asm.finish();

    assert_eq!(
        table.column("home.kickReturns"),
        Some(&[None, None, s("4")][..])
    );
    assert_eq!(
        table.column("away.totalYards"),
        Some(&[s("250"), s("199"), None][..])
    );
    assert_eq!(table.column("id"), Some(&[s("1"), s("2"), s("3")][..]));
}

#[test]
fn columns_keep_first_seen_order() {
    let mut asm = WideTableAssembler::new();
    asm.add_game("1", vec![("zeta", s("1")), ("alpha", s("2"))], vec![("beta", s("3"))]);
    asm.add_game("2", vec![("gamma", s("4"))], vec![("alpha", s("5"))]);
    let names = asm.table().column_names().collect::<Vec<_>>();
    assert_eq!(
        names,
        vec!["id", "home.zeta", "home.alpha", "away.beta", "home.gamma", "away.alpha"]
    );
}

#[test]
fn fixture_roles_follow_home_away_tag() {
    let entries = parse_team_game_stats_json(&read_fixture("team_stats_week1.json"))
        .expect("fixture should parse");
    assert_eq!(entries.len(), 2);

    let mut asm = WideTableAssembler::new();
    for entry in &entries {
        let (home, away) = entry.home_away().expect("one home, one away");
        asm.add_game(&entry.id, home.stat_pairs(), away.stat_pairs());
    }
    let table = asm.finish();
    assert_rectangular(&table, 2);

    // Second game lists the away team first.
    assert_eq!(table.cell(1, "id"), Some("332413"));
    assert_eq!(table.cell(1, "home.thirdDownEff"), Some("8-9"));
    assert_eq!(table.cell(1, "away.thirdDownEff"), Some("10-12"));
    assert_eq!(table.cell(1, "away.totalYards"), Some("380"));
    assert_eq!(table.cell(1, "away.fourthDownEff"), None);
    assert_eq!(table.cell(0, "away.kickReturns"), None);
    assert_eq!(table.column_count(), 10);
}

#[test]
fn concat_unions_columns() {
    let mut a = WideTableAssembler::new();
    a.add_game("1", vec![("x", s("1"))], no_stats());
    let mut b = WideTableAssembler::new();
    b.add_game("2", vec![("y", s("2"))], no_stats());
    b.add_game("3", vec![("x", s("3"))], no_stats());

    let merged = WideTable::concat([a.finish(), b.finish()]);
    assert_rectangular(&merged, 3);
    assert_eq!(merged.column("home.x"), Some(&[s("1"), None, s("3")][..]));
    assert_eq!(merged.column("home.y"), Some(&[None, s("2"), None][..]));
}

#[test]
fn csv_round_trip_preserves_absent_cells() {
    let mut asm = WideTableAssembler::new();
    asm.add_game("1", vec![("a", s("1-2"))], no_stats());
    asm.add_game("2", vec![("b", s("x,y"))], vec![("a", s("\"q\""))]);
    let table = asm.finish();

    let mut buf = Vec::new();
    table.write_csv(&mut buf).unwrap();
    let text = String::from_utf8(buf.clone()).unwrap();
    assert!(text.starts_with("id,home.a,home.b,away.a\n"));

    let back = WideTable::read_csv(&buf[..]).unwrap();
    assert_eq!(back, table);
}
