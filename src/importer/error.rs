// ==========================================
// 商品目录同步系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层: 数据流级（致命）/ 行级（跳过）/ 维度级 / 内部
// ==========================================

use crate::domain::{DimensionKind, ImportPhase};
use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.xlsx/.xls）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 数据流错误（致命，中止本次导入）=====
    #[error("数据流读取失败 (已读 {rows_read} 行): {message}")]
    StreamError { rows_read: usize, message: String },

    // ===== 行级错误（跳过该行）=====
    #[error("供应商编号缺失 (行 {row})")]
    MissingVendor { row: usize },

    #[error("行记录无法解码 (行 {row}): {message}")]
    RecordDecodeError { row: usize, message: String },

    // ===== 维度错误 =====
    #[error("维度解析失败 ({kind} {key}): {message}")]
    DimensionResolution {
        kind: DimensionKind,
        key: String,
        message: String,
    },

    // ===== 状态机错误 =====
    #[error("非法的导入状态转换: {from} -> {to}")]
    InvalidPhaseTransition { from: ImportPhase, to: ImportPhase },

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    // ===== 数据库错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为致命错误（数据源无法打开或读取）
    pub fn is_stream_level(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::UnsupportedFormat(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
                | ImportError::StreamError { .. }
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImporterResult<T> = Result<T, ImportError>;
