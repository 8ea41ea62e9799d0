use crate::Error;

/// Per-question container of tally cells.
///
/// Homomorphic and non-homomorphic questions use a flat list, list questions a list per list.
/// The same shape carries tallies, decryption factors, proofs and results, so values for the
/// same question can be zipped cell by cell.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum Cells<T> {
    Flat(Vec<T>),
    Nested(Vec<Vec<T>>),
}

impl<T> Cells<T> {
    pub fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        match self {
            Cells::Flat(v) => Box::new(v.iter()),
            Cells::Nested(v) => Box::new(v.iter().flatten()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Cells::Flat(v) => v.len(),
            Cells::Nested(v) => v.iter().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> Cells<U> {
        match self {
            Cells::Flat(v) => Cells::Flat(v.iter().map(&mut f).collect()),
            Cells::Nested(v) => Cells::Nested(
                v.iter()
                    .map(|row| row.iter().map(&mut f).collect())
                    .collect(),
            ),
        }
    }

    pub fn try_map<U, F: FnMut(&T) -> Result<U, Error>>(&self, mut f: F) -> Result<Cells<U>, Error> {
        Ok(match self {
            Cells::Flat(v) => Cells::Flat(v.iter().map(&mut f).collect::<Result<_, _>>()?),
            Cells::Nested(v) => Cells::Nested(
                v.iter()
                    .map(|row| row.iter().map(&mut f).collect::<Result<_, _>>())
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Same variant and the same length for every row.
    pub fn same_shape<U>(&self, other: &Cells<U>) -> bool {
        match (self, other) {
            (Cells::Flat(a), Cells::Flat(b)) => a.len() == b.len(),
            (Cells::Nested(a), Cells::Nested(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.len() == y.len())
            }
            _ => false,
        }
    }

    /// Combine two containers of the same shape cell by cell.
    pub fn zip_with<U, V, F: FnMut(&T, &U) -> V>(
        &self,
        other: &Cells<U>,
        mut f: F,
    ) -> Result<Cells<V>, Error> {
        if !self.same_shape(other) {
            return Err(Error::WrongLength {
                what: "cells",
                expected: self.len(),
                found: other.len(),
            });
        }
        Ok(match (self, other) {
            (Cells::Flat(a), Cells::Flat(b)) => {
                Cells::Flat(a.iter().zip(b).map(|(x, y)| f(x, y)).collect())
            }
            (Cells::Nested(a), Cells::Nested(b)) => Cells::Nested(
                a.iter()
                    .zip(b)
                    .map(|(xs, ys)| xs.iter().zip(ys).map(|(x, y)| f(x, y)).collect())
                    .collect(),
            ),
            // same_shape rules out mixed variants
            _ => unreachable!(),
        })
    }
}
