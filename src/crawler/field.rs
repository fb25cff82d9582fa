use once_cell::unsync::OnceCell;

use crate::error::ScrapeError;

/// Memo for one typed value computed from a page's document.
///
/// The first access runs the computation and keeps whatever it produced,
/// value or error. Every later access hands back a clone of that outcome
/// without touching the document again.
pub struct Field<T> {
    cell: OnceCell<Result<T, ScrapeError>>,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field {
            cell: OnceCell::new(),
        }
    }
}

impl<T: Clone> Field<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<F>(&self, compute: F) -> Result<T, ScrapeError>
    where
        F: FnOnce() -> Result<T, ScrapeError>,
    {
        self.cell.get_or_init(compute).clone()
    }

    pub fn is_computed(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn test_value_is_computed_once() {
        let runs = Cell::new(0);
        let field: Field<Option<f64>> = Field::new();
        assert!(!field.is_computed());

        for _ in 0..3 {
            let value = field.get_or_compute(|| {
                runs.set(runs.get() + 1);
                Ok(Some(4.75))
            });
            assert_eq!(value, Ok(Some(4.75)));
        }

        assert_eq!(runs.get(), 1);
        assert!(field.is_computed());
    }

    #[test]
    fn test_error_is_kept() {
        let runs = Cell::new(0);
        let field: Field<String> = Field::new();

        for _ in 0..2 {
            let value = field.get_or_compute(|| {
                runs.set(runs.get() + 1);
                Err(ScrapeError::not_found("div.stock_label", "https://minkabu.jp/stock/6758"))
            });
            assert_eq!(
                value,
                Err(ScrapeError::not_found("div.stock_label", "https://minkabu.jp/stock/6758"))
            );
        }

        assert_eq!(runs.get(), 1);
    }
}
