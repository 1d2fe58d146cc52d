// ==========================================
// 商品目录同步系统 - 数据源解析器
// ==========================================
// 支持: CSV（逐行流式读取）/ Excel (.xlsx/.xls，读取首个工作表)
// 约定:
// - 表头去除首尾空白（及 UTF-8 BOM）
// - 允许行长度不一致
// - 完全空白的行跳过
// - I/O 错误为数据流级错误；其余解码错误为行级错误
// ==========================================

use crate::importer::error::{ImportError, ImporterResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// 原始行记录（列名 → 值）
pub type RawRecord = HashMap<String, String>;

// ==========================================
// SourceRow - 数据源产出的一行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRow {
    /// 正常记录
    Record { row_number: usize, fields: RawRecord },
    /// 无法解码的记录（行级错误，跳过）
    Undecodable { row_number: usize, message: String },
}

// ==========================================
// RowSource Trait - 逐行数据源
// ==========================================
pub trait RowSource: Send {
    /// 读取下一行
    ///
    /// # 返回
    /// - None: 数据结束
    /// - Some(Ok(row)): 一行（正常或不可解码）
    /// - Some(Err(e)): 数据流级错误，调用方应中止
    fn next_row(&mut self) -> Option<ImporterResult<SourceRow>>;

    /// 表头（已规范化）
    fn headers(&self) -> &[String];
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// 单元格转文本: 整数值的浮点单元格（编号列常见）不带小数部分
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn build_record(headers: &[String], values: impl Iterator<Item = String>) -> Option<RawRecord> {
    let mut row_map = HashMap::new();
    for (header, value) in headers.iter().zip(values) {
        row_map.insert(header.clone(), value.trim().to_string());
    }

    if row_map.values().all(|v| v.is_empty()) {
        return None;
    }
    Some(row_map)
}

// ==========================================
// CsvRowSource - CSV 流式数据源
// ==========================================
pub struct CsvRowSource<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    record: StringRecord,
    row_number: usize,
}

impl<R: Read> CsvRowSource<R> {
    /// 从任意 Read 创建 CSV 数据源（读取表头）
    pub fn from_reader(reader: R) -> ImporterResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| stream_error(0, e))?
            .iter()
            .map(normalize_header)
            .collect();

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
            row_number: 0,
        })
    }
}

impl CsvRowSource<BufReader<File>> {
    /// 打开 CSV 文件
    pub fn open(path: &Path) -> ImporterResult<Self> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

fn stream_error(rows_read: usize, err: csv::Error) -> ImportError {
    if err.is_io_error() {
        ImportError::StreamError {
            rows_read,
            message: err.to_string(),
        }
    } else {
        ImportError::CsvParseError(err.to_string())
    }
}

impl<R: Read + Send> RowSource for CsvRowSource<R> {
    fn next_row(&mut self) -> Option<ImporterResult<SourceRow>> {
        loop {
            match self.reader.read_record(&mut self.record) {
                Ok(false) => return None,
                Ok(true) => {
                    self.row_number += 1;
                    let values = self.record.iter().map(str::to_string);
                    if let Some(fields) = build_record(&self.headers, values) {
                        return Some(Ok(SourceRow::Record {
                            row_number: self.row_number,
                            fields,
                        }));
                    }
                }
                Err(e) if e.is_io_error() => {
                    return Some(Err(ImportError::StreamError {
                        rows_read: self.row_number,
                        message: e.to_string(),
                    }));
                }
                Err(e) => {
                    self.row_number += 1;
                    return Some(Ok(SourceRow::Undecodable {
                        row_number: self.row_number,
                        message: e.to_string(),
                    }));
                }
            }
        }
    }

    fn headers(&self) -> &[String] {
        &self.headers
    }
}

// ==========================================
// ExcelRowSource - Excel 数据源
// ==========================================
// calamine 需要一次性载入工作表，之后按行产出
pub struct ExcelRowSource {
    headers: Vec<String>,
    rows: std::vec::IntoIter<Vec<String>>,
    row_number: usize,
}

impl ExcelRowSource {
    /// 打开 Excel 文件并载入首个工作表
    pub fn open(path: &Path) -> ImporterResult<Self> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let mut workbook = open_workbook_auto(path)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());

        let headers = rows
            .next()
            .map(|header_row| header_row.iter().map(|h| normalize_header(h)).collect())
            .unwrap_or_default();

        Ok(Self {
            headers,
            rows: rows.collect::<Vec<_>>().into_iter(),
            row_number: 0,
        })
    }
}

impl RowSource for ExcelRowSource {
    fn next_row(&mut self) -> Option<ImporterResult<SourceRow>> {
        for values in self.rows.by_ref() {
            self.row_number += 1;
            if let Some(fields) = build_record(&self.headers, values.into_iter()) {
                return Some(Ok(SourceRow::Record {
                    row_number: self.row_number,
                    fields,
                }));
            }
        }
        None
    }

    fn headers(&self) -> &[String] {
        &self.headers
    }
}

// ==========================================
// FeedSource - 导入入口的数据源句柄
// ==========================================
pub enum FeedSource {
    /// 文件路径（按扩展名选择解析器）
    Path(PathBuf),
    /// 任意 CSV 字节流
    Reader {
        name: String,
        reader: Box<dyn Read + Send>,
    },
}

impl FeedSource {
    pub fn path<P: AsRef<Path>>(path: P) -> Self {
        FeedSource::Path(path.as_ref().to_path_buf())
    }

    pub fn reader<R: Read + Send + 'static>(name: impl Into<String>, reader: R) -> Self {
        FeedSource::Reader {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    /// 数据源描述（用于日志与运行台账）
    pub fn describe(&self) -> String {
        match self {
            FeedSource::Path(path) => path.display().to_string(),
            FeedSource::Reader { name, .. } => name.clone(),
        }
    }

    /// 打开数据源
    pub fn open(self) -> ImporterResult<Box<dyn RowSource>> {
        match self {
            FeedSource::Path(path) => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_lowercase();

                match ext.as_str() {
                    "csv" => Ok(Box::new(CsvRowSource::open(&path)?)),
                    "xlsx" | "xls" => Ok(Box::new(ExcelRowSource::open(&path)?)),
                    _ => Err(ImportError::UnsupportedFormat(ext)),
                }
            }
            FeedSource::Reader { reader, .. } => Ok(Box::new(CsvRowSource::from_reader(reader)?)),
        }
    }
}
