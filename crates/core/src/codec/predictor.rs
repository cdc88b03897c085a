//! PNG and TIFF predictors (`/Predictor` decode parameter).

use crate::error::{PdfError, Result};
use crate::model::Dict;

/// Row geometry from `/Colors`, `/BitsPerComponent` and `/Columns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predictor {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Predictor {
    /// Read predictor parameters; `None` when no prediction applies.
    pub fn from_parms(parms: Option<&Dict>) -> Result<Option<Self>> {
        let Some(parms) = parms else {
            return Ok(None);
        };
        let int = |key: &str, default: i64| {
            parms
                .get(key)
                .and_then(|v| v.as_int().ok())
                .unwrap_or(default)
        };
        let predictor = int("Predictor", 1);
        if predictor <= 1 {
            return Ok(None);
        }
        let colors = int("Colors", 1);
        let bpc = int("BitsPerComponent", 8);
        let columns = int("Columns", 1);
        if !(1..=32).contains(&colors)
            || ![1, 2, 4, 8, 16].contains(&bpc)
            || !(1..=1 << 24).contains(&columns)
        {
            return Err(PdfError::DecodeError(format!(
                "bad predictor parameters: Colors {} BitsPerComponent {} Columns {}",
                colors, bpc, columns
            )));
        }
        Ok(Some(Self {
            predictor,
            colors: colors as usize,
            bits_per_component: bpc as usize,
            columns: columns as usize,
        }))
    }

    fn row_bytes(&self) -> usize {
        (self.colors * self.columns * self.bits_per_component).div_ceil(8)
    }

    fn bytes_per_pixel(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }

    /// Undo prediction on decoded data.
    pub fn decode(&self, data: &[u8], strict: bool) -> Result<Vec<u8>> {
        match self.predictor {
            2 => self.decode_tiff(data),
            10..=15 => self.decode_png(data, strict),
            other => Err(PdfError::DecodeError(format!("unknown predictor {}", other))),
        }
    }

    fn decode_tiff(&self, data: &[u8]) -> Result<Vec<u8>> {
        if self.bits_per_component != 8 {
            return Err(PdfError::DecodeError(format!(
                "TIFF predictor with {} bits per component",
                self.bits_per_component
            )));
        }
        let row_bytes = self.row_bytes();
        let bpp = self.colors;
        let mut out = data.to_vec();
        for row in out.chunks_mut(row_bytes) {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        Ok(out)
    }

    /// PNG prediction adds a filter-type byte at the start of each row.
    fn decode_png(&self, data: &[u8], strict: bool) -> Result<Vec<u8>> {
        let row_bytes = self.row_bytes();
        let bpp = self.bytes_per_pixel();
        let row_size = row_bytes + 1;

        if strict && data.len() % row_size != 0 {
            return Err(PdfError::DecodeError(format!(
                "PNG predictor: {} bytes is not a whole number of {}-byte rows",
                data.len(),
                row_size
            )));
        }

        let mut result = Vec::with_capacity(data.len());
        let mut prev_row = vec![0u8; row_bytes];
        let mut current_row = vec![0u8; row_bytes];

        for row in data.chunks_exact(row_size) {
            let filter_type = row[0];
            let row_data = &row[1..];

            match filter_type {
                0 => current_row.copy_from_slice(row_data),
                1 => {
                    for i in 0..row_bytes {
                        let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                        current_row[i] = row_data[i].wrapping_add(left);
                    }
                }
                2 => {
                    for i in 0..row_bytes {
                        current_row[i] = row_data[i].wrapping_add(prev_row[i]);
                    }
                }
                3 => {
                    for i in 0..row_bytes {
                        let left = if i >= bpp { current_row[i - bpp] as u16 } else { 0 };
                        let above = prev_row[i] as u16;
                        current_row[i] = row_data[i].wrapping_add(((left + above) / 2) as u8);
                    }
                }
                4 => {
                    for i in 0..row_bytes {
                        let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                        let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                        current_row[i] =
                            row_data[i].wrapping_add(paeth(left, prev_row[i], upper_left));
                    }
                }
                other if strict => {
                    return Err(PdfError::DecodeError(format!(
                        "PNG predictor: unknown row filter {}",
                        other
                    )));
                }
                _ => current_row.copy_from_slice(row_data),
            }

            result.extend_from_slice(&current_row);
            std::mem::swap(&mut prev_row, &mut current_row);
        }

        Ok(result)
    }
}

/// Apply the PNG "Up" filter to rows of `columns` bytes. Used for
/// cross-reference streams, whose rows compress well against the row above.
pub fn png_up_encode(data: &[u8], columns: usize) -> Vec<u8> {
    let columns = columns.max(1);
    let mut out = Vec::with_capacity(data.len() + data.len() / columns + 1);
    let mut prev: &[u8] = &[];
    for row in data.chunks(columns) {
        out.push(2);
        for (i, &b) in row.iter().enumerate() {
            out.push(b.wrapping_sub(prev.get(i).copied().unwrap_or(0)));
        }
        prev = row;
    }
    out
}

/// Paeth predictor function used in PNG filtering.
const fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}
