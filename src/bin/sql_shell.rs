//! Interactive SQL shell.
//!
//! Usage:
//!   sql_shell [db_path]
//!
//! Statements end with ';' and may span lines. Parse, bind, and execution
//! errors print as one diagnostic line and the shell keeps going; only
//! unrecoverable I/O terminates it. Meta commands: `\tables` lists the
//! catalog, `exit` / `quit` flush and leave.

use relstore::{sql, Config, Database, StatementResult};
use std::io::{BufRead, Write};
use std::process::exit;

fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "relstore.db".to_string());

    let mut db = match Database::open(Config::new(&path)) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: failed to open database '{}': {}", path, e);
            exit(1);
        }
    };

    println!("relstore shell: {}", path);
    println!("Statements end with ';'.  \\tables lists tables, 'exit' leaves.");

    let stdin = std::io::stdin();
    let mut pending = String::new();

    loop {
        let prompt = if pending.is_empty() { "relstore> " } else { "      -> " };
        print!("{}", prompt);
        if std::io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("ERROR: {}", e);
                exit(1);
            }
        }
        let trimmed = line.trim();

        if pending.is_empty() {
            match trimmed {
                "" => continue,
                "exit" | "quit" => break,
                "\\tables" => {
                    list_tables(&db);
                    continue;
                }
                _ => {}
            }
        }

        pending.push_str(&line);
        if !trimmed.ends_with(';') {
            continue;
        }

        let statement = std::mem::take(&mut pending);
        match db.execute(&statement) {
            Ok(result) => print_result(result),
            Err(e) => eprintln!("ERROR: {}", e),
        }
    }

    if let Err(e) = db.flush() {
        eprintln!("ERROR: flush failed: {}", e);
        exit(1);
    }
}

fn list_tables(db: &Database) {
    let mut tables: Vec<_> = db.catalog().tables().collect();
    tables.sort_by_key(|t| t.id);
    if tables.is_empty() {
        println!("no tables");
        return;
    }
    for table in tables {
        let columns: Vec<String> = table
            .schema
            .columns()
            .iter()
            .map(|c| format!("{} {}", c.name, c.data_type))
            .collect();
        println!("{} ({})", table.name, columns.join(", "));
    }
}

fn print_result(result: StatementResult) {
    match result {
        StatementResult::Rows { schema, rows } => {
            let header: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();
            println!("{}", header.join(" | "));
            let count = rows.len();
            for row in rows {
                let values: Vec<String> = sql::value::decode_row(&schema, &row)
                    .iter()
                    .map(|v| v.to_string())
                    .collect();
                println!("{}", values.join(" | "));
            }
            println!("({} rows)", count);
        }
        StatementResult::Inserted(count) => println!("OK ({} row inserted)", count),
        StatementResult::TableCreated(name) => println!("OK (table {})", name),
        StatementResult::IndexCreated(name) => println!("OK (index {})", name),
    }
}
