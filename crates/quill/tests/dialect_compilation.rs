//! Cross-dialect compilation smoke tests through the public facade.
//!
//! One builder shape, five grammars: these tests pin the
//! dialect-visible differences (identifier quoting, pagination
//! strategy, conflict handling) without reaching into crate internals.

use quill::{Builder, Value};

fn query() -> [Builder; 5] {
    [
        Builder::generic(),
        Builder::mysql(),
        Builder::postgres(),
        Builder::sqlite(),
        Builder::sqlserver(),
    ]
}

#[test]
fn identifier_quoting_per_dialect() {
    let compiled: Vec<String> = query()
        .into_iter()
        .map(|b| b.from("users").select(["name"]).to_sql().unwrap())
        .collect();
    assert_eq!(
        compiled,
        vec![
            "select \"name\" from \"users\"",
            "select `name` from `users`",
            "select \"name\" from \"users\"",
            "select \"name\" from \"users\"",
            "select [name] from [users]",
        ]
    );
}

#[test]
fn bindings_are_identical_across_dialects() {
    for builder in query() {
        let q = builder
            .from("orders")
            .where_("total", ">", 100)
            .unwrap()
            .where_in("status", ["open", "paid"])
            .unwrap();
        assert_eq!(
            q.bindings(),
            vec![
                Value::Int(100),
                Value::Text("open".into()),
                Value::Text("paid".into()),
            ]
        );
    }
}

#[test]
fn pagination_strategies_differ() {
    let page = |b: Builder| {
        b.from("users")
            .order_by("id", "asc")
            .unwrap()
            .for_page(2, 10)
            .to_sql()
            .unwrap()
    };

    assert_eq!(
        page(Builder::mysql()),
        "select * from `users` order by `id` asc limit 10 offset 10"
    );
    // SQL Server has no limit/offset keywords; rows are numbered and
    // filtered in an outer query.
    assert_eq!(
        page(Builder::sqlserver()),
        "select * from (select *, row_number() over (order by [id] asc) as row_num \
         from [users]) as [temp_table] where row_num between 11 and 20 order by row_num"
    );
}

#[test]
fn conflict_handling_per_dialect() {
    let upsert = |b: Builder| {
        b.from("users").upsert_statement(
            [[("email", "a@b.c"), ("name", "Ada")]],
            &["email"],
            None,
        )
    };

    let (mysql, _) = upsert(Builder::mysql()).unwrap();
    assert!(mysql.contains("on duplicate key update"));

    let (postgres, _) = upsert(Builder::postgres()).unwrap();
    assert!(postgres.contains("on conflict (\"email\") do update set"));

    let (sqlserver, _) = upsert(Builder::sqlserver()).unwrap();
    assert!(sqlserver.starts_with("merge [users]"));

    let err = upsert(Builder::generic()).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn json_paths_render_in_the_dialect_syntax() {
    let q = |b: Builder| {
        b.from("users")
            .where_eq("prefs->theme", "dark")
            .unwrap()
            .to_sql()
            .unwrap()
    };

    assert!(q(Builder::mysql()).contains("json_unquote(json_extract(`prefs`, '$.\"theme\"'))"));
    assert!(q(Builder::postgres()).contains("\"prefs\"->>'theme'"));
    assert!(q(Builder::sqlite()).contains("json_extract(\"prefs\", '$.\"theme\"')"));

    let err = Builder::generic()
        .from("users")
        .where_eq("prefs->theme", "dark")
        .unwrap()
        .to_sql()
        .unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn json_values_bind_as_parameters() {
    let document = Value::from(serde_json::json!({ "theme": "dark", "beta": true }));
    let q = Builder::postgres()
        .from("users")
        .where_eq("prefs", document.clone())
        .unwrap();

    assert_eq!(q.to_sql().unwrap(), "select * from \"users\" where \"prefs\" = ?");
    assert_eq!(q.bindings(), vec![document]);
}

#[test]
fn compilation_is_repeatable() {
    for builder in query() {
        let q = builder
            .from("events")
            .where_in("kind", ["click", "view"])
            .unwrap()
            .order_by("id", "desc")
            .unwrap()
            .limit(5);
        let first = q.to_sql_with_bindings().unwrap();
        let second = q.to_sql_with_bindings().unwrap();
        assert_eq!(first, second);
    }
}
