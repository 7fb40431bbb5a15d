use tabcalc::config::Config;
use tabcalc::ledger::Ledger;
use tabcalc::tax::TaxDirection;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_gst_line_and_total() {
    let config = Config::default();
    let mut ledger = Ledger::new(config.ledger.pages, config.tax.default_rate);

    ledger.set_input("1000");
    assert_eq!(ledger.live_preview(), 1000.0);
    ledger.commit_with_tax(TaxDirection::Add, None);

    let item = &ledger.page().items[0];
    let tax = item.tax.unwrap();
    assert_eq!(tax.details.base, 1000.0);
    assert!(close(tax.details.tax_amount, 180.0));
    assert!(close(item.result, 1180.0));
    assert!(close(ledger.grand_total(), 1180.0));
    assert_eq!(config.format(ledger.grand_total()), "1,180.00");
}

#[test]
fn test_live_preview_counts_until_committed() {
    let mut ledger = Ledger::new(2, 18.0);
    ledger.set_input("40");
    ledger.commit();
    ledger.set_input("2x(3");
    assert_eq!(ledger.grand_total(), 46.0);
    ledger.set_input("2x(3+");
    assert_eq!(ledger.grand_total(), 40.0);
}
