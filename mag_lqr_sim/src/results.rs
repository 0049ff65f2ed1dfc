use std::{
    collections::HashMap,
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use csv::Writer;
use thiserror::Error;

pub type ResultWriter = Writer<BufWriter<File>>;

#[derive(Debug, Error)]
pub enum ResultErrors {
    #[error("{0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("no result writer with id {0}")]
    WriterNotFound(u32),
}

/// Owns one csv writer per result file under a common directory.
pub struct ResultManager {
    writers: HashMap<u32, ResultWriter>,
    pub result_path: PathBuf,
    next_id: u32,
}

impl ResultManager {
    pub fn new(result_path: impl AsRef<Path>) -> Result<Self, ResultErrors> {
        let result_path = result_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&result_path)?;
        Ok(Self {
            writers: HashMap::new(),
            result_path,
            next_id: 0,
        })
    }

    /// Creates `<result_path>/<name>.csv` with the given header row.
    pub fn new_writer(&mut self, name: &str, headers: &[&str]) -> Result<u32, ResultErrors> {
        let file = File::create(self.result_path.join(format!("{name}.csv")))?;
        let mut writer = Writer::from_writer(BufWriter::new(file));
        writer.write_record(headers)?;
        let id = self.next_id;
        self.writers.insert(id, writer);
        self.next_id += 1;
        Ok(id)
    }

    pub fn write_record(&mut self, id: u32, content: &[String]) -> Result<(), ResultErrors> {
        let writer = self
            .writers
            .get_mut(&id)
            .ok_or(ResultErrors::WriterNotFound(id))?;
        writer.write_record(content)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ResultErrors> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
