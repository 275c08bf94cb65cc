// ==========================================
// 合作社收款台账 - 导出文件编码
// ==========================================
// 两种格式内容一致:
//   5 行抬头 + 空行 + 10 列表格（表头行 + 数据行）
// TXT: 制表符分隔（csv crate, 不加引号）
// XLSX: 单工作表 "Collections"（rust_xlsxwriter）
// ==========================================

use crate::domain::entities::{Agent, ExportCollectionRow, Society};
use crate::domain::money::{format_paise, paise_to_rupees, to_iso_date, to_iso_timestamp};
use crate::domain::types::ExportFormat;
use crate::export::error::ExportResult;
use chrono::{DateTime, Utc};
use csv::{QuoteStyle, WriterBuilder};
use rust_xlsxwriter::{Format, Workbook};

pub const SHEET_NAME: &str = "Collections";

pub const COLUMNS: [&str; 10] = [
    "Account No",
    "Client Name",
    "Account Head",
    "Head Code",
    "Account Type",
    "Frequency",
    "Collected Amount",
    "Collected At",
    "Collection Date",
    "Remarks",
];

// 金额所在列（XLSX 中写为数值）
const AMOUNT_COLUMN: usize = 6;

/// 待编码的导出文档
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub header_lines: Vec<String>,
    pub rows: Vec<ExportLine>,
}

/// 表格中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct ExportLine {
    pub cells: [String; 10],
    pub collected_paise: i64,
}

impl ExportLine {
    pub fn from_row(row: &ExportCollectionRow) -> Self {
        Self {
            cells: [
                row.account_no.clone(),
                row.client_name.clone(),
                row.account_head.clone().unwrap_or_default(),
                row.account_head_code.clone().unwrap_or_default(),
                row.account_type.to_string(),
                row.frequency.to_string(),
                format_paise(row.collected_paise),
                to_iso_timestamp(row.collected_at),
                to_iso_date(row.collection_date),
                row.remarks.clone().unwrap_or_default(),
            ],
            collected_paise: row.collected_paise,
        }
    }
}

/// 组装一个批次的导出文档
pub fn build_export_document(
    society: &Society,
    agent: &Agent,
    lot_label: &str,
    exported_at: DateTime<Utc>,
    rows: &[ExportCollectionRow],
) -> ExportDocument {
    ExportDocument {
        header_lines: vec![
            society.name.clone(),
            format!("Agent: {} - {}", agent.code, agent.name),
            format!("Exported At: {}", to_iso_timestamp(exported_at)),
            format!("Lot: {}", lot_label),
            format!("Records: {}", rows.len()),
        ],
        rows: rows.iter().map(ExportLine::from_row).collect(),
    }
}

/// 单元格内的制表符/换行替换为空格
fn sanitize_text_cell(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\r' | '\n') { ' ' } else { c })
        .collect()
}

/// 制表符分隔文本
pub fn encode_txt(doc: &ExportDocument) -> ExportResult<Vec<u8>> {
    let mut buffer = Vec::new();
    for line in &doc.header_lines {
        buffer.extend_from_slice(sanitize_text_cell(line).as_bytes());
        buffer.push(b'\n');
    }
    buffer.push(b'\n');

    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_writer(buffer);
    writer.write_record(COLUMNS)?;
    for line in &doc.rows {
        writer.write_record(line.cells.iter().map(|c| sanitize_text_cell(c)))?;
    }
    writer
        .into_inner()
        .map_err(|e| crate::export::error::ExportError::TextEncodeError(e.to_string()))
}

/// XLSX 工作簿
pub fn encode_xlsx(doc: &ExportDocument) -> ExportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let amount_format = Format::new().set_num_format("0.00");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let mut row: u32 = 0;
    for line in &doc.header_lines {
        worksheet.write_string(row, 0, line)?;
        row += 1;
    }
    row += 1; // 空行

    for (col, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(row, col as u16, *title, &bold)?;
    }
    row += 1;

    for line in &doc.rows {
        for (col, value) in line.cells.iter().enumerate() {
            if col == AMOUNT_COLUMN {
                worksheet.write_number_with_format(
                    row,
                    col as u16,
                    paise_to_rupees(line.collected_paise),
                    &amount_format,
                )?;
            } else {
                worksheet.write_string(row, col as u16, value)?;
            }
        }
        row += 1;
    }

    Ok(workbook.save_to_buffer()?)
}

/// 按格式编码
pub fn encode_document(doc: &ExportDocument, format: ExportFormat) -> ExportResult<Vec<u8>> {
    match format {
        ExportFormat::Xlsx => encode_xlsx(doc),
        ExportFormat::Txt => encode_txt(doc),
    }
}

/// 分享时使用的 MIME 类型
pub fn mime_type(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ExportFormat::Txt => "text/plain",
    }
}
