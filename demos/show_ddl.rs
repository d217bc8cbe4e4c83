use binder::prelude::*;

fn main() -> Result<()> {
    let foo = Table::new(
        "foo",
        vec![
            Column::auto_id("foo_id"),
            Column::integer("i1"),
            Column::text_with("s1", TextOptions::new(10).collate_nocase()),
            Column::date("d1"),
        ],
    )?;

    let baz = Table::new(
        "baz",
        vec![
            Column::auto_id("baz_id"),
            Column::float("f3"),
            Column::text_with("s3", TextOptions::new(5).unique()),
        ],
    )?;

    for dialect in [Dialect::Sqlite, Dialect::Postgres, Dialect::Mysql] {
        println!("-- {}", dialect);
        for table in [&foo, &baz] {
            println!("{};", table.create_table_sql(dialect));
        }

        let select = SelectBuilder::new(&foo)
            .where_clause(foo.q("i1")?.greater_than(3)?)
            .order_by(foo.q("s1")?.asc())
            .build(dialect)?;
        println!("{}", select.sql);
        println!("params: {:?}", select.params);
        println!("---");
    }

    Ok(())
}
