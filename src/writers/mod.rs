//! Output writers. Each one is a [`rowql_core::RowWriter`].

mod csv;
mod json;
mod pretty;
mod sql;

pub use self::csv::{CsvWriter, CsvWriterOptions};
pub use self::json::JsonWriter;
pub use self::pretty::PrettyWriter;
pub use self::sql::{SqlWriter, SqlWriterOptions};

use rowql_core::RowqlError;

use crate::error::FormatError;

fn io_error(err: std::io::Error) -> RowqlError {
    FormatError::from(err).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowql_core::RowWriter;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn write_all(writer: &mut dyn RowWriter, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        writer.write_header(&columns).unwrap();
        for row in rows {
            writer.write_row(row).unwrap();
        }
        writer.flush().unwrap();
    }

    #[test]
    fn test_csv_writer() {
        let buf = SharedBuffer::default();
        let mut writer = CsvWriter::new(Box::new(buf.clone()), CsvWriterOptions::default(), false);
        write_all(
            &mut writer,
            &["a", "b"],
            vec![vec![json!(1), Value::Null], vec![json!("x,y"), json!([1, 2])]],
        );
        assert_eq!(buf.text(), "a,b\n1,\n\"x,y\",\"[1,2]\"\n");

        let buf = SharedBuffer::default();
        let options = CsvWriterOptions {
            header: false,
            delimiter: b';',
        };
        let mut writer = CsvWriter::new(Box::new(buf.clone()), options, true);
        write_all(&mut writer, &["a", "b"], vec![vec![json!(1), json!(2.5)]]);
        assert_eq!(buf.text(), "1;2.5\n");
    }

    #[test]
    fn test_json_writer() {
        let buf = SharedBuffer::default();
        let mut writer = JsonWriter::new(Box::new(buf.clone()), false);
        write_all(&mut writer, &["a", "b"], vec![vec![json!(1), Value::Null]]);
        assert_eq!(buf.text(), "{\"a\":1,\"b\":null}\n");

        let buf = SharedBuffer::default();
        let mut writer = JsonWriter::new(Box::new(buf.clone()), false);
        write_all(&mut writer, &["json"], vec![vec![json!({"x": 1})]]);
        assert_eq!(buf.text(), "{\"x\":1}\n");
    }

    #[test]
    fn test_pretty_writer() {
        let buf = SharedBuffer::default();
        let mut writer = PrettyWriter::new(Box::new(buf.clone()), true);
        write_all(
            &mut writer,
            &["name", "n"],
            vec![vec![json!("alice"), json!(1)], vec![json!("bo"), json!(100)]],
        );
        assert_eq!(
            buf.text(),
            "name   n\n-----  ---\nalice    1\nbo     100\n"
        );
    }

    #[test]
    fn test_sql_writer_chunks() {
        let buf = SharedBuffer::default();
        let options = SqlWriterOptions {
            table: "people".to_string(),
            chunk_size: 2,
        };
        let mut writer = SqlWriter::new(Box::new(buf.clone()), options);
        write_all(
            &mut writer,
            &["name", "age"],
            vec![
                vec![json!("a"), json!(1)],
                vec![json!("b"), Value::Null],
                vec![json!("c"), json!(3)],
            ],
        );
        assert_eq!(
            buf.text(),
            "INSERT INTO \"people\"(\"name\",\"age\") VALUES ('a',1),('b',NULL);\n\
             INSERT INTO \"people\"(\"name\",\"age\") VALUES ('c',3);\n"
        );
    }
}
