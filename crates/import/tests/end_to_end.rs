use splitbook_core::{Categories, Cell, Report};
use splitbook_import::engine::{categorize, parse_shared, parse_transactions, reconcile};
use splitbook_import::{CsvError, NoResolver};

const HEADER: &str = "Date,Description,Sub-Description,Type of Transaction,Amount,Balance";

fn column(report: &Report, name: &str) -> usize {
    report
        .columns()
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, i)| i)
        .unwrap()
}

fn cell(report: &Report, row: usize, col: usize) -> String {
    report.rows()[row][col].to_string()
}

#[test]
fn single_walmart_row_with_default_categories() {
    let text = format!("{HEADER}\n2024-01-01,Walmart,,Debit,-54.30,1000.00\n");
    let txs = parse_transactions(&text).unwrap();
    let report = categorize(&txs, &Categories::builtin(), &mut NoResolver).unwrap();

    assert_eq!(report.len(), 4);
    let groceries = column(&report, "Groceries");
    assert_eq!(cell(&report, 2, groceries), "Walmart ");
    assert_eq!(cell(&report, 2, groceries + 1), "$ -54.30");

    let totals = report.rows().last().unwrap();
    assert_eq!(totals[0], Cell::from("Total"));
    for (name, col) in report.columns() {
        let expected = if name == "Groceries" { "$ -54.30" } else { "$ -" };
        assert_eq!(totals[col + 1].to_string(), expected, "column {name}");
    }
}

#[test]
fn shared_expense_replaces_matching_grocery_cell() {
    let text = format!("{HEADER}\n2024-01-01,Walmart,,Debit,-54.30,1000.00\n");
    let txs = parse_transactions(&text).unwrap();
    let report = categorize(&txs, &Categories::builtin(), &mut NoResolver).unwrap();

    // The bank shows the purchase as -54.30; the shared sheet tracks it the same way.
    let shared = parse_shared(
        "Date,Expense,Description,Total,Brandon\n2024-01-01,Groceries,split groceries,-54.30,27.15\n",
    );
    let report = reconcile(report, &shared);

    let groceries = column(&report, "Groceries");
    assert_eq!(report.len(), 4);
    assert_eq!(cell(&report, 2, groceries), "split groceries");
    assert_eq!(cell(&report, 2, groceries + 1), "$ 27.15");
    // Totals are left as they were.
    assert_eq!(cell(&report, 3, groceries + 1), "$ -54.30");
}

#[test]
fn shared_total_with_opposite_sign_is_inserted_not_matched() {
    let text = format!("{HEADER}\n2024-01-01,Walmart,,Debit,-54.30,1000.00\n");
    let txs = parse_transactions(&text).unwrap();
    let report = categorize(&txs, &Categories::builtin(), &mut NoResolver).unwrap();

    // The shared sheet records the purchase as a positive 54.30.
    let shared = parse_shared(
        "Date,Expense,Description,Total,Brandon\n2024-01-01,groceries,split groceries,54.30,27.15\n",
    );
    let report = reconcile(report, &shared);

    let groceries = column(&report, "Groceries");
    assert_eq!(report.len(), 5);
    assert_eq!(cell(&report, 2, groceries), "Walmart ");
    assert_eq!(cell(&report, 2, groceries + 1), "$ -54.30");
    assert_eq!(cell(&report, 3, groceries), "split groceries");
    assert_eq!(cell(&report, 3, groceries + 1), "$ 27.15");
    assert_eq!(report.rows()[4][0], Cell::from("Total"));
    assert_eq!(cell(&report, 4, groceries + 1), "$ -54.30");
}

#[test]
fn shared_expense_with_positive_total_matches_positive_cell() {
    let text = format!("{HEADER}\n2024-01-01,Walmart refund,,Credit,54.30,\n");
    let txs = parse_transactions(&text).unwrap();
    let report = categorize(&txs, &Categories::builtin(), &mut NoResolver).unwrap();
    let shared = parse_shared("h\n2024-01-01,groceries,split groceries,54.30,27.15\n");
    let report = reconcile(report, &shared);

    let groceries = column(&report, "Groceries");
    assert_eq!(cell(&report, 2, groceries), "split groceries");
    assert_eq!(cell(&report, 2, groceries + 1), "$ 27.15");
}

#[test]
fn virgin_plus_bill_is_split_across_two_columns() {
    let text = format!("{HEADER}\n2024-01-05,Preauth Debit,VIRGIN PLUS,Debit,-153.34,\n");
    let txs = parse_transactions(&text).unwrap();
    let report = categorize(&txs, &Categories::builtin(), &mut NoResolver).unwrap();

    let living = column(&report, "Living Expenses");
    let phone = column(&report, "Phone Bill");
    assert_eq!(cell(&report, 2, living), "Internet + TV");
    assert_eq!(cell(&report, 2, living + 1), "$ -60.16");
    assert_eq!(cell(&report, 2, phone), "Phone Bill");
    assert_eq!(cell(&report, 2, phone + 1), "$ -93.18");
    assert_eq!(cell(&report, 2, column(&report, "Subscriptions")), "");
}

#[test]
fn income_is_classified_but_not_rendered() {
    let text = format!("{HEADER}\n2024-01-15,Payroll Deposit,,Credit,2000.00,\n");
    let txs = parse_transactions(&text).unwrap();
    let report = categorize(&txs, &Categories::builtin(), &mut NoResolver).unwrap();

    assert_eq!(report.rows()[0][0], Cell::from("Expenses"));
    assert_eq!(report.len(), 3);
    assert!(report.rows().iter().flatten().all(|c| !c.to_string().contains("Payroll")));
}

#[test]
fn interactive_answers_file_unmatched_rows() {
    let text = format!("{HEADER}\n2024-02-14,Florist,,Debit,-45.00,\n2024-02-15,REF date=2024-02-15,,Debit,-1.00,\n");
    let txs = parse_transactions(&text).unwrap();
    let mut asked = Vec::new();
    let mut resolver = |d: &str| {
        asked.push(d.to_string());
        "Gifts".to_string()
    };
    let report = categorize(&txs, &Categories::builtin(), &mut resolver).unwrap();

    assert_eq!(asked, vec![" Florist"]);
    let gifts = column(&report, "Gifts");
    assert_eq!(cell(&report, 2, gifts), "Florist ");
    assert_eq!(cell(&report, 3, gifts + 1), "$ -45.00");
}

#[test]
fn strict_parse_rejects_blank_file() {
    assert_eq!(parse_transactions("  \n"), Err(CsvError::EmptyInput));
}

#[test]
fn categories_without_expenses_fail_before_prompting() {
    let cats = Categories::from_json(r#"{"Income": {"Pay": ["payroll"]}}"#).unwrap();
    let txs = parse_transactions(&format!("{HEADER}\n2024-01-01,Mystery,,Debit,-1.00,\n")).unwrap();
    let mut prompted = false;
    let mut resolver = |_: &str| {
        prompted = true;
        String::new()
    };
    assert!(categorize(&txs, &cats, &mut resolver).is_err());
    assert!(!prompted);
}

#[test]
fn csv_export_keeps_header_body_and_totals() {
    let text = format!("{HEADER}\n2024-01-01,Costco,\"Wholesale\",Debit,-10.00,\n");
    let txs = parse_transactions(&text).unwrap();
    let report = categorize(&txs, &Categories::builtin(), &mut NoResolver).unwrap();
    let report = reconcile(report, &parse_shared("h\n2024-01-01,pets,dog food,1.23,0.50\n"));

    let csv = report.to_csv().unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("Expenses,Living Expenses,,Groceries,,"));
    assert!(lines[2].contains("Costco Wholesale,$ -10.00"));
    assert!(lines[3].contains("dog food,$ 0.50"));
    assert!(lines[4].starts_with("Total,"));
}
