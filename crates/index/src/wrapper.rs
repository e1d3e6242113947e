use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use parking_lot::Mutex;
use storage::{Tuple, TupleAddress, TupleSchema};

use crate::adapter::{IndexScan, ScanStart, TableIndex};
use crate::error::IndexResult;
use crate::scheme::{IndexScheme, IndexStats};

/// Decorator that forwards every call to the wrapped index and appends a
/// trace record per call to `<dir>/<index name>.trace`.
///
/// A record is a `CMD` line, then per argument an `ARG` line naming its role
/// followed by its `TUPLE` and/or `VALUE` lines, then a `RESULT` line. Fields
/// are tab separated. A tuple argument's `VALUE` is its row address.
pub struct TracingIndex {
    inner: Box<dyn TableIndex>,
    out: Mutex<BufWriter<File>>,
    path: PathBuf,
    failed: AtomicBool,
}

impl TracingIndex {
    pub fn create(inner: Box<dyn TableIndex>, dir: &Path) -> IndexResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.trace", inner.name()));
        let file = File::create(&path)?;
        Ok(Self {
            inner,
            out: Mutex::new(BufWriter::new(file)),
            path,
            failed: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> std::io::Result<()> {
        self.out.lock().flush()
    }

    fn record(&self, op: &str, args: &[Arg<'_>], result: &dyn Display) {
        let mut out = self.out.lock();
        if let Err(e) = write_record(&mut *out, op, args, result) {
            drop(out);
            self.report(e);
        }
    }

    fn report(&self, error: std::io::Error) {
        if !self.failed.swap(true, Ordering::Relaxed) {
            warn!(
                "index {}: cannot write trace {}: {}",
                self.inner.name(),
                self.path.display(),
                error
            );
        }
    }

    fn record_row(&self, op: &str, row: &Option<Tuple>) {
        match row {
            Some(row) => self.record(op, &[], row),
            None => self.record(op, &[], &"none"),
        }
    }
}

impl Drop for TracingIndex {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            self.report(e);
        }
    }
}

/// One traced argument, named by its role in the call.
enum Arg<'a> {
    Tuple(&'static str, &'a Tuple),
    Value(&'static str, &'a dyn Display),
}

fn write_record(
    out: &mut impl Write,
    op: &str,
    args: &[Arg<'_>],
    result: &dyn Display,
) -> std::io::Result<()> {
    writeln!(out, "CMD\t{}", op)?;
    for arg in args {
        match arg {
            Arg::Tuple(role, tuple) => {
                writeln!(out, "ARG\t{}", role)?;
                writeln!(out, "TUPLE\t{}", tuple)?;
                if let Some(address) = tuple.address() {
                    writeln!(out, "VALUE\t{}", address)?;
                }
            }
            Arg::Value(role, value) => {
                writeln!(out, "ARG\t{}", role)?;
                writeln!(out, "VALUE\t{}", value)?;
            }
        }
    }
    writeln!(out, "RESULT\t{}", result)
}

fn outcome<T>(result: &IndexResult<T>) -> String {
    match result {
        Ok(_) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    }
}

impl TableIndex for TracingIndex {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    fn scheme(&self) -> &IndexScheme {
        self.inner.scheme()
    }

    fn key_schema(&self) -> &Arc<TupleSchema> {
        self.inner.key_schema()
    }

    fn stats(&self) -> IndexStats {
        self.inner.stats()
    }

    fn add_entry(&mut self, tuple: &Tuple) -> bool {
        let result = self.inner.add_entry(tuple);
        self.record("add_entry", &[Arg::Tuple("tuple", tuple)], &result);
        result
    }

    fn delete_entry(&mut self, tuple: &Tuple) -> bool {
        let result = self.inner.delete_entry(tuple);
        self.record("delete_entry", &[Arg::Tuple("tuple", tuple)], &result);
        result
    }

    fn replace_entry(&mut self, old: &Tuple, new: &Tuple) -> bool {
        let result = self.inner.replace_entry(old, new);
        self.record(
            "replace_entry",
            &[Arg::Tuple("old", old), Arg::Tuple("new", new)],
            &result,
        );
        result
    }

    fn set_entry_to_new_address(
        &mut self,
        tuple: &Tuple,
        new_address: TupleAddress,
        old_address: TupleAddress,
    ) -> bool {
        let result = self
            .inner
            .set_entry_to_new_address(tuple, new_address, old_address);
        self.record(
            "set_entry_to_new_address",
            &[
                Arg::Tuple("tuple", tuple),
                Arg::Value("new_address", &new_address),
                Arg::Value("old_address", &old_address),
            ],
            &result,
        );
        result
    }

    fn check_for_index_change(&self, lhs: &Tuple, rhs: &Tuple) -> bool {
        let result = self.inner.check_for_index_change(lhs, rhs);
        self.record(
            "check_for_index_change",
            &[Arg::Tuple("lhs", lhs), Arg::Tuple("rhs", rhs)],
            &result,
        );
        result
    }

    fn exists(&self, tuple: &Tuple) -> bool {
        let result = self.inner.exists(tuple);
        self.record("exists", &[Arg::Tuple("tuple", tuple)], &result);
        result
    }

    fn move_to_key(&mut self, key: &Tuple) -> bool {
        let result = self.inner.move_to_key(key);
        self.record("move_to_key", &[Arg::Tuple("key", key)], &result);
        result
    }

    fn move_to_tuple(&mut self, tuple: &Tuple) -> bool {
        let result = self.inner.move_to_tuple(tuple);
        self.record("move_to_tuple", &[Arg::Tuple("tuple", tuple)], &result);
        result
    }

    fn move_to_key_or_greater(&mut self, key: &Tuple) -> IndexResult<()> {
        let result = self.inner.move_to_key_or_greater(key);
        self.record(
            "move_to_key_or_greater",
            &[Arg::Tuple("key", key)],
            &outcome(&result),
        );
        result
    }

    fn move_to_greater_than_key(&mut self, key: &Tuple) -> IndexResult<()> {
        let result = self.inner.move_to_greater_than_key(key);
        self.record(
            "move_to_greater_than_key",
            &[Arg::Tuple("key", key)],
            &outcome(&result),
        );
        result
    }

    fn move_to_end(&mut self, forward: bool) -> IndexResult<()> {
        let result = self.inner.move_to_end(forward);
        self.record(
            "move_to_end",
            &[Arg::Value("forward", &forward)],
            &outcome(&result),
        );
        result
    }

    fn next_value(&mut self) -> Option<Tuple> {
        let row = self.inner.next_value();
        self.record_row("next_value", &row);
        row
    }

    fn next_value_at_key(&mut self) -> Option<Tuple> {
        let row = self.inner.next_value_at_key();
        self.record_row("next_value_at_key", &row);
        row
    }

    fn advance_to_next_key(&mut self) -> bool {
        let result = self.inner.advance_to_next_key();
        self.record("advance_to_next_key", &[], &result);
        result
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn memory_estimate(&self) -> usize {
        self.inner.memory_estimate()
    }

    fn scan(&self, start: ScanStart<'_>) -> IndexResult<IndexScan<'_>> {
        let args: Vec<Arg<'_>> = match start {
            ScanStart::Begin => Vec::new(),
            ScanStart::Key(key) | ScanStart::KeyOrGreater(key) | ScanStart::GreaterThan(key) => {
                vec![Arg::Tuple("key", key)]
            }
        };
        let result = self.inner.scan(start);
        self.record("scan", &args, &outcome(&result));
        result
    }
}
