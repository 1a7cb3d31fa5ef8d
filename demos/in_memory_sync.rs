use tracking_reconciler::{reconcile, Cell, RawRecord, ReconcileConfig, Sheet, TrackingWorkbook};

fn billing_row(row: usize, site: &str, period: &str, value: &str, receipt: &str) -> RawRecord {
    let cell = |s: &str| if s.is_empty() { Cell::Empty } else { Cell::text(s) };
    RawRecord {
        row,
        site_id: cell(site),
        period_start: cell(period),
        invoice_date: cell(period),
        invoice_value: cell(value),
        receipt_date: cell(receipt),
    }
}

fn main() {
    let mut sheet = Sheet::new("12 - Site Alpha");
    for (col, label) in ["MÊS", "DATA NF", "VALOR NF", "DATA DO RECEBIMENTO"]
        .iter()
        .enumerate()
    {
        sheet.set_cell(2, col + 1, Cell::text(*label));
    }
    sheet.set_cell(3, 1, Cell::text("MARÇO/24"));
    sheet.set_cell(4, 1, Cell::text("ABRIL/24"));
    let workbook = TrackingWorkbook::new(vec![sheet]);

    let records = vec![
        billing_row(2, "12", "2024-03-05", "1000", ""),
        billing_row(3, "12", "2024-03-20", "500", "2024-04-10"),
        billing_row(4, "99", "2024-03-20", "42", ""),
    ];

    let config = ReconcileConfig::default();
    let output = reconcile(&records, workbook, &config).expect("in-memory inputs are valid");

    println!("{}", output.report);

    let sheet = output.workbook.sheet(0).expect("sheet exists");
    for row in 2..=sheet.max_row() {
        let cells: Vec<String> = (1..=4)
            .map(|col| match sheet.cell(row, col) {
                Cell::Empty => String::new(),
                Cell::Text(s) => s.clone(),
                Cell::Number(n) => n.to_string(),
                Cell::Date(d) => d.format("%d/%m/%Y").to_string(),
                Cell::DateTime(dt) => dt.format("%d/%m/%Y %H:%M").to_string(),
                Cell::Time(t) => t.format("%H:%M").to_string(),
                Cell::Duration(d) => format!("{}min", d.num_minutes()),
                Cell::Bool(b) => b.to_string(),
                Cell::Error(e) => e.clone(),
                Cell::Formula { formula, .. } => format!("={}", formula),
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
}
