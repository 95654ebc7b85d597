use std::io::{self, Write};

use serde::Serialize;

use crate::app::{AvailableResult, DeleteResult, DownloadResult, ListResult};
use crate::convert::ConversionReport;
use crate::store::ZooDatasetInfo;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_available(result: &AvailableResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_download(result: &DownloadResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_list(result: &ListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_info(result: &ZooDatasetInfo) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_delete(result: &DeleteResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_convert(result: &ConversionReport) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, _event: crate::app::ProgressEvent) {}
}
