//! Tax add-on applied to an already evaluated base amount.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxDirection {
    /// Base is net, tax is added on top.
    Add,
    /// Base is gross, tax is taken out of it.
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxDetails {
    pub base: f64,
    pub rate: f64,
    pub tax_amount: f64,
}

/// Returns the final amount and the breakdown.
pub fn apply(base: f64, rate: f64, direction: TaxDirection) -> (f64, TaxDetails) {
    let factor = 1.0 + rate / 100.0;
    let (total, tax_amount) = match direction {
        TaxDirection::Add => {
            let total = base * factor;
            (total, total - base)
        }
        TaxDirection::Remove => {
            let total = base / factor;
            (total, base - total)
        }
    };
    (total, TaxDetails { base, rate, tax_amount })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxLine {
    pub direction: TaxDirection,
    pub details: TaxDetails,
}

impl TaxLine {
    /// Central share: half the rate, half the amount.
    pub fn cgst(&self) -> (f64, f64) {
        (self.details.rate / 2.0, self.details.tax_amount / 2.0)
    }

    /// State share, same split as [`TaxLine::cgst`].
    pub fn sgst(&self) -> (f64, f64) {
        self.cgst()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_add() {
        let (total, details) = apply(1000.0, 18.0, TaxDirection::Add);
        assert!(close(total, 1180.0));
        assert!(close(details.tax_amount, 180.0));
        assert_eq!(details.base, 1000.0);
        assert_eq!(details.rate, 18.0);
    }

    #[test]
    fn test_remove() {
        let (total, details) = apply(1180.0, 18.0, TaxDirection::Remove);
        assert!(close(total, 1000.0));
        assert!(close(details.tax_amount, 180.0));
    }

    #[test]
    fn test_zero_rate() {
        let (total, details) = apply(250.0, 0.0, TaxDirection::Add);
        assert_eq!(total, 250.0);
        assert_eq!(details.tax_amount, 0.0);
    }

    #[test]
    fn test_gst_split() {
        let (_, details) = apply(1000.0, 18.0, TaxDirection::Add);
        let line = TaxLine { direction: TaxDirection::Add, details };
        let (rate, amount) = line.cgst();
        assert_eq!(rate, 9.0);
        assert!(close(amount, 90.0));
        assert_eq!(line.sgst(), line.cgst());
    }
}
