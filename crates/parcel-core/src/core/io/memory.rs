use super::traits::{Archive, ArchiveError, AttrValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Fixed length, or `None` for the unlimited (record) dimension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub dims: Vec<String>,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Row-major values; unwritten elements hold NaN.
    #[serde(deserialize_with = "nullable_floats")]
    pub data: Vec<f64>,
}

/// JSON has no NaN: serde_json writes it as `null`, so read `null` back as NaN.
fn nullable_floats<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<Option<f64>> = Deserialize::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Everything an archive holds, in a form that serde can persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveContents {
    pub dimensions: BTreeMap<String, Dimension>,
    pub variables: BTreeMap<String, Variable>,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl ArchiveContents {
    fn shape_of(&self, variable: &Variable) -> Vec<Option<usize>> {
        variable
            .dims
            .iter()
            .map(|d| self.dimensions.get(d).and_then(|dim| dim.size))
            .collect()
    }

    /// Number of elements in one record (the product of every fixed dimension).
    fn row_len(shape: &[Option<usize>]) -> usize {
        shape.iter().map(|s| s.unwrap_or(1)).product()
    }

    /// Number of records written so far to a variable; `1` for fixed-size variables.
    pub fn records(&self, name: &str) -> Option<usize> {
        let variable = self.variables.get(name)?;
        let shape = self.shape_of(variable);
        match shape.first() {
            Some(None) => Some(variable.data.len() / Self::row_len(&shape).max(1)),
            _ => Some(1),
        }
    }

    /// Reads the element at `index`, if it has been allocated.
    pub fn value(&self, name: &str, index: &[usize]) -> Option<f64> {
        let variable = self.variables.get(name)?;
        let shape = self.shape_of(variable);
        let flat = Self::flat_index(&shape, index)?;
        variable.data.get(flat).copied()
    }

    /// Largest record count over every variable defined on an unlimited dimension.
    pub fn record_count(&self) -> usize {
        self.variables
            .keys()
            .filter(|name| {
                self.variables[*name]
                    .dims
                    .first()
                    .and_then(|d| self.dimensions.get(d))
                    .is_some_and(|d| d.size.is_none())
            })
            .filter_map(|name| self.records(name))
            .max()
            .unwrap_or(0)
    }

    fn flat_index(shape: &[Option<usize>], index: &[usize]) -> Option<usize> {
        if shape.len() != index.len() {
            return None;
        }
        let mut flat = 0usize;
        for (&i, &size) in index.iter().zip(shape) {
            let extent = match size {
                Some(n) if i >= n => return None,
                Some(n) => n,
                None => 1,
            };
            flat = flat * extent + i;
        }
        Some(flat)
    }

    pub(crate) fn create_dimension(
        &mut self,
        name: &str,
        size: Option<usize>,
    ) -> Result<(), ArchiveError> {
        if self.dimensions.contains_key(name) {
            return Err(ArchiveError::DuplicateDimension(name.to_string()));
        }
        self.dimensions
            .insert(name.to_string(), Dimension { size });
        Ok(())
    }

    pub(crate) fn create_variable(
        &mut self,
        name: &str,
        dims: &[&str],
        unit: &str,
        description: Option<&str>,
    ) -> Result<(), ArchiveError> {
        if self.variables.contains_key(name) {
            return Err(ArchiveError::DuplicateVariable(name.to_string()));
        }
        let mut shape = Vec::with_capacity(dims.len());
        for (i, dim) in dims.iter().enumerate() {
            let dimension =
                self.dimensions
                    .get(*dim)
                    .ok_or_else(|| ArchiveError::UnknownDimension {
                        variable: name.to_string(),
                        dimension: dim.to_string(),
                    })?;
            if dimension.size.is_none() && i > 0 {
                return Err(ArchiveError::MisplacedUnlimited(name.to_string()));
            }
            shape.push(dimension.size);
        }
        let initial_len = match shape.first() {
            Some(None) => 0,
            _ => Self::row_len(&shape),
        };
        self.variables.insert(
            name.to_string(),
            Variable {
                dims: dims.iter().map(|d| d.to_string()).collect(),
                unit: unit.to_string(),
                description: description.map(str::to_string),
                data: vec![f64::NAN; initial_len],
            },
        );
        Ok(())
    }

    pub(crate) fn write(
        &mut self,
        name: &str,
        index: &[usize],
        value: f64,
    ) -> Result<(), ArchiveError> {
        let variable = self
            .variables
            .get(name)
            .ok_or_else(|| ArchiveError::UnknownVariable(name.to_string()))?;
        let shape = self.shape_of(variable);
        let flat =
            Self::flat_index(&shape, index).ok_or_else(|| ArchiveError::IndexOutOfBounds {
                variable: name.to_string(),
                index: index.to_vec(),
                shape: shape.clone(),
            })?;
        let row_len = Self::row_len(&shape);

        let data = &mut self
            .variables
            .get_mut(name)
            .ok_or_else(|| ArchiveError::UnknownVariable(name.to_string()))?
            .data;
        if flat >= data.len() {
            // Only reachable through the unlimited dimension: grow by whole records.
            let records = flat / row_len + 1;
            data.resize(records * row_len, f64::NAN);
        }
        data[flat] = value;
        Ok(())
    }

    pub(crate) fn write_slice(&mut self, name: &str, values: &[f64]) -> Result<(), ArchiveError> {
        let variable = self
            .variables
            .get_mut(name)
            .ok_or_else(|| ArchiveError::UnknownVariable(name.to_string()))?;
        if variable.data.len() != values.len() {
            return Err(ArchiveError::SliceLength {
                variable: name.to_string(),
                expected: variable.data.len(),
                given: values.len(),
            });
        }
        variable.data.copy_from_slice(values);
        Ok(())
    }
}

/// An archive kept entirely in memory; used by tests and for programmatic inspection.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    contents: ArchiveContents,
    finished: bool,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &ArchiveContents {
        &self.contents
    }

    pub fn into_contents(self) -> ArchiveContents {
        self.contents
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn ensure_open(&self) -> Result<(), ArchiveError> {
        if self.finished {
            Err(ArchiveError::Finished)
        } else {
            Ok(())
        }
    }
}

impl Archive for MemoryArchive {
    fn create_dimension(&mut self, name: &str, size: Option<usize>) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.create_dimension(name, size)
    }

    fn create_variable(
        &mut self,
        name: &str,
        dims: &[&str],
        unit: &str,
        description: Option<&str>,
    ) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.create_variable(name, dims, unit, description)
    }

    fn write(&mut self, name: &str, index: &[usize], value: f64) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.write(name, index, value)
    }

    fn write_slice(&mut self, name: &str, values: &[f64]) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.write_slice(name, values)
    }

    fn set_attribute(&mut self, name: &str, value: AttrValue) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ArchiveError> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive_with_spectrum() -> MemoryArchive {
        let mut archive = MemoryArchive::new();
        archive.create_dimension("t", None).unwrap();
        archive.create_dimension("radii", Some(3)).unwrap();
        archive
            .create_variable("radii_m0", &["t", "radii"], "m^0 (kg of dry air)^-1", None)
            .unwrap();
        archive
            .create_variable("radii_r_wet", &["radii"], "m", Some("left bin edge"))
            .unwrap();
        archive.create_variable("z", &["t"], "m", None).unwrap();
        archive
    }

    #[test]
    fn fixed_variables_are_preallocated() {
        let archive = archive_with_spectrum();
        let var = &archive.contents().variables["radii_r_wet"];
        assert_eq!(var.data.len(), 3);
        assert!(var.data.iter().all(|v| v.is_nan()));
        assert_eq!(archive.contents().records("radii_m0"), Some(0));
    }

    #[test]
    fn writes_to_unlimited_dimension_grow_by_records() {
        let mut archive = archive_with_spectrum();
        archive.write("radii_m0", &[0, 2], 5.0).unwrap();
        archive.write("radii_m0", &[2, 1], 7.0).unwrap();
        let contents = archive.contents();
        assert_eq!(contents.records("radii_m0"), Some(3));
        assert_eq!(contents.value("radii_m0", &[0, 2]), Some(5.0));
        assert_eq!(contents.value("radii_m0", &[2, 1]), Some(7.0));
        assert!(contents.value("radii_m0", &[1, 0]).unwrap().is_nan());
        assert_eq!(contents.record_count(), 3);
    }

    #[test]
    fn out_of_bounds_fixed_index_is_rejected() {
        let mut archive = archive_with_spectrum();
        let err = archive.write("radii_m0", &[0, 3], 1.0).unwrap_err();
        assert!(matches!(err, ArchiveError::IndexOutOfBounds { .. }));
        let err = archive.write("radii_m0", &[0], 1.0).unwrap_err();
        assert!(matches!(err, ArchiveError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut archive = archive_with_spectrum();
        assert!(matches!(
            archive.write("nope", &[0], 1.0),
            Err(ArchiveError::UnknownVariable(_))
        ));
        assert!(matches!(
            archive.create_variable("x", &["missing"], "1", None),
            Err(ArchiveError::UnknownDimension { .. })
        ));
        assert!(matches!(
            archive.create_dimension("t", None),
            Err(ArchiveError::DuplicateDimension(_))
        ));
    }

    #[test]
    fn unlimited_dimension_must_come_first() {
        let mut archive = archive_with_spectrum();
        assert!(matches!(
            archive.create_variable("bad", &["radii", "t"], "1", None),
            Err(ArchiveError::MisplacedUnlimited(_))
        ));
    }

    #[test]
    fn write_slice_requires_matching_length() {
        let mut archive = archive_with_spectrum();
        archive
            .write_slice("radii_r_wet", &[1.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(archive.contents().value("radii_r_wet", &[1]), Some(2.0));
        assert!(matches!(
            archive.write_slice("radii_r_wet", &[1.0]),
            Err(ArchiveError::SliceLength { .. })
        ));
    }

    #[test]
    fn finished_archive_rejects_writes() {
        let mut archive = archive_with_spectrum();
        archive.finish().unwrap();
        assert!(archive.is_finished());
        assert!(matches!(
            archive.write("z", &[0], 1.0),
            Err(ArchiveError::Finished)
        ));
        assert!(matches!(
            archive.set_attribute("a", AttrValue::Bool(true)),
            Err(ArchiveError::Finished)
        ));
    }
}
