use log::debug;
use std::time::Duration;

use crate::browser::{PageDriver, TableCells};
use crate::error::{DriverError, ScrapeError};

/// Header row plus body rows of cell text. Every row has exactly as many
/// cells as the header and no row is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ScrapeError> {
        let rows: Vec<Vec<String>> = rows.into_iter().filter(|r| !r.is_empty()).collect();

        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != header.len())
        {
            return Err(ScrapeError::Extraction(format!(
                "row {} has {} cells, header has {}",
                idx,
                row.len(),
                header.len()
            )));
        }

        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads the first `<table>` of the current page into a [`RawTable`].
#[derive(Debug, Clone, Default)]
pub struct TableExtractor;

impl TableExtractor {
    pub async fn extract<P>(
        &self,
        page: &mut P,
        load_timeout: Duration,
    ) -> Result<RawTable, ScrapeError>
    where
        P: PageDriver + ?Sized,
    {
        let cells = page.read_table(load_timeout).await.map_err(|e| match e {
            DriverError::SessionLost(msg) => ScrapeError::Unexpected(msg),
            other => ScrapeError::Extraction(other.to_string()),
        })?;
        let table = Self::shape(cells)?;
        debug!("Extracted {} rows x {} columns", table.len(), table.header().len());
        Ok(table)
    }

    /// Trims every cell, skips the header row and drops rows without cells.
    pub fn shape(cells: TableCells) -> Result<RawTable, ScrapeError> {
        let header: Vec<String> = cells.header.iter().map(|h| h.trim().to_string()).collect();
        if header.is_empty() {
            return Err(ScrapeError::Extraction("table has no header cells".to_string()));
        }

        let rows = cells
            .rows
            .into_iter()
            .skip(1)
            .map(|row| row.iter().map(|c| c.trim().to_string()).collect())
            .collect();

        let table = RawTable::new(header, rows)?;
        if table.is_empty() {
            return Err(ScrapeError::Extraction("table has no data rows".to_string()));
        }
        Ok(table)
    }
}
