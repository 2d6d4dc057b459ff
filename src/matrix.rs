//! Dense row-major matrices and the accumulate-style kernels the network is
//! built from.
//!
//! Every `accumulate*` operation adds its result into `self`; nothing is
//! overwritten unless the method name says so. With the `blas` feature the
//! products are handed to the system BLAS, otherwise they run as plain loops.
//! Non-finite values are not checked for anywhere in this module.

use crate::error::{check_dim, Error, Result};
use crate::utils::ZeroOut;

use rand::distributions::Distribution;
use rand::Rng;

#[derive(Clone, Debug, PartialEq)]
pub struct Mat {
    rows: usize,
    cols: usize,
    data: Vec<f64>, // row-major array
}

impl Mat {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Mat {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wraps `data` as a `rows x cols` matrix.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        check_dim("Mat::from_vec", rows * cols, data.len())?;
        Ok(Mat { rows, cols, data })
    }

    /// Builds a matrix from equally long rows.
    pub fn from_rows<R>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[f64]>,
    {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut mat = Mat::zeros(0, cols);
        for row in rows {
            mat.push_row(row.as_ref())?;
        }
        Ok(mat)
    }

    /// Creates a matrix whose entries are drawn from `distribution`.
    pub fn random<D, R>(distribution: &D, rng: &mut R, rows: usize, cols: usize) -> Self
    where
        D: Distribution<f64>,
        R: Rng + ?Sized,
    {
        let mut mat = Mat::zeros(rows, cols);
        mat.fill_random(distribution, rng);
        mat
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of entries, always `rows * cols`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let cols = self.cols;
        &mut self.data[row * cols..(row + 1) * cols]
    }

    /// Iterates over the rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks() panics on zero; an empty-column matrix has no data anyway
        self.data.chunks(self.cols.max(1))
    }

    /// Replaces the contents of `row` with `values`.
    pub fn set_row(&mut self, row: usize, values: &[f64]) -> Result<()> {
        check_dim("Mat::set_row", self.cols, values.len())?;
        if row >= self.rows {
            return Err(Error::DimensionMismatch {
                context: "Mat::set_row row index",
                expected: self.rows,
                found: row,
            });
        }
        self.row_mut(row).copy_from_slice(values);
        Ok(())
    }

    pub fn set_entry(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Appends a row, growing the matrix by one.
    pub fn push_row(&mut self, values: &[f64]) -> Result<()> {
        check_dim("Mat::push_row", self.cols, values.len())?;
        self.data.extend_from_slice(values);
        self.rows += 1;
        Ok(())
    }

    /// Changes the number of rows, zero-filling any new rows. The allocation
    /// is kept when shrinking so the buffer can be regrown cheaply.
    pub fn resize_rows(&mut self, rows: usize) {
        self.data.resize(rows * self.cols, 0.0);
        self.rows = rows;
    }

    /// Overwrites self with `other`, which must have the same number of
    /// columns; the row count follows `other`.
    pub fn copy_from(&mut self, other: &Mat) -> Result<()> {
        check_dim("Mat::copy_from", self.cols, other.cols)?;
        self.data.clear();
        self.data.extend_from_slice(&other.data);
        self.rows = other.rows;
        Ok(())
    }

    pub fn fill(&mut self, value: f64) {
        for x in &mut self.data {
            *x = value;
        }
    }

    pub fn fill_random<D, R>(&mut self, distribution: &D, rng: &mut R)
    where
        D: Distribution<f64>,
        R: Rng + ?Sized,
    {
        for x in &mut self.data {
            *x = distribution.sample(rng);
        }
    }

    /// `self *= alpha`
    pub fn scale(&mut self, alpha: f64) {
        for x in &mut self.data {
            *x *= alpha;
        }
    }

    /// The Euclidean (Frobenius) norm of all entries.
    pub fn norm(&self) -> f64 {
        euclidean_norm(&self.data)
    }

    pub fn row_norm(&self, row: usize) -> f64 {
        euclidean_norm(self.row(row))
    }

    /// Rescales `row` so its Euclidean norm becomes `target_norm`, keeping
    /// its direction. An all-zero row is left alone.
    pub fn rescale_row(&mut self, row: usize, target_norm: f64) {
        let norm = self.row_norm(row);
        if norm > 0.0 {
            let factor = target_norm / norm;
            for x in self.row_mut(row) {
                *x *= factor;
            }
        }
    }

    /// Shrinks every row whose norm exceeds `max_norm` down to `max_norm`.
    pub fn cap_row_norms(&mut self, max_norm: f64) {
        for row in 0..self.rows {
            if self.row_norm(row) > max_norm {
                self.rescale_row(row, max_norm);
            }
        }
    }

    /// `self[i] = f(source[i])` for every entry.
    pub fn map_from<F>(&mut self, source: &Mat, f: F) -> Result<()>
    where
        F: Fn(f64) -> f64,
    {
        check_dim("Mat::map_from rows", self.rows, source.rows)?;
        check_dim("Mat::map_from cols", self.cols, source.cols)?;
        for (y, &x) in self.data.iter_mut().zip(&source.data) {
            *y = f(x);
        }
        Ok(())
    }

    /// `self[i] = f(self[i], other[i])` for every entry.
    pub fn zip_apply<F>(&mut self, other: &Mat, f: F) -> Result<()>
    where
        F: Fn(f64, f64) -> f64,
    {
        check_dim("Mat::zip_apply rows", self.rows, other.rows)?;
        check_dim("Mat::zip_apply cols", self.cols, other.cols)?;
        for (y, &x) in self.data.iter_mut().zip(&other.data) {
            *y = f(*y, x);
        }
        Ok(())
    }

    /// `self += alpha * x`
    pub fn accumulate(&mut self, alpha: f64, x: &Mat) -> Result<()> {
        check_dim("Mat::accumulate rows", self.rows, x.rows)?;
        check_dim("Mat::accumulate cols", self.cols, x.cols)?;
        for (y, &x) in self.data.iter_mut().zip(&x.data) {
            *y += alpha * x;
        }
        Ok(())
    }

    /// `self += alpha * a * x`
    pub fn accumulate_product(&mut self, alpha: f64, a: &Mat, x: &Mat) -> Result<()> {
        gemm(alpha, (a, false), (x, false), self)
    }

    /// `self += a^T * x`
    pub fn accumulate_product_transpose_left(&mut self, a: &Mat, x: &Mat) -> Result<()> {
        gemm(1.0, (a, true), (x, false), self)
    }

    /// `self += a * x^T`
    pub fn accumulate_product_transpose_right(&mut self, a: &Mat, x: &Mat) -> Result<()> {
        gemm(1.0, (a, false), (x, true), self)
    }

    /// `self += x * y^T`
    pub fn accumulate_outer_product(&mut self, x: &[f64], y: &[f64]) -> Result<()> {
        check_dim("Mat::accumulate_outer_product rows", self.rows, x.len())?;
        check_dim("Mat::accumulate_outer_product cols", self.cols, y.len())?;
        backend::ger(1.0, x, y, self);
        Ok(())
    }

    /// `y += alpha * self * x`, the matrix-vector form of
    /// `accumulate_product`.
    pub fn accumulate_product_vec(&self, alpha: f64, x: &[f64], y: &mut [f64]) -> Result<()> {
        check_dim("Mat::accumulate_product_vec x", self.cols, x.len())?;
        check_dim("Mat::accumulate_product_vec y", self.rows, y.len())?;
        backend::gemv(false, alpha, self, x, y);
        Ok(())
    }

    /// `y += alpha * self^T * x`
    pub fn accumulate_product_transpose_vec(
        &self,
        alpha: f64,
        x: &[f64],
        y: &mut [f64],
    ) -> Result<()> {
        check_dim("Mat::accumulate_product_transpose_vec x", self.rows, x.len())?;
        check_dim("Mat::accumulate_product_transpose_vec y", self.cols, y.len())?;
        backend::gemv(true, alpha, self, x, y);
        Ok(())
    }

    /// Adds the sum of every row into `out`.
    pub fn accumulate_column_sums(&self, out: &mut [f64]) -> Result<()> {
        check_dim("Mat::accumulate_column_sums", self.cols, out.len())?;
        for row in self.iter_rows() {
            for (o, &x) in out.iter_mut().zip(row) {
                *o += x;
            }
        }
        Ok(())
    }
}

impl ZeroOut for Mat {
    fn zero_out(&mut self) {
        self.data.zero_out();
    }
}

fn euclidean_norm(values: &[f64]) -> f64 {
    values.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Shape of `m` after an optional transpose.
fn op_shape(m: &Mat, transpose: bool) -> (usize, usize) {
    if transpose {
        (m.cols, m.rows)
    } else {
        (m.rows, m.cols)
    }
}

/// `c += alpha * op(a) * op(b)`
fn gemm(alpha: f64, a: (&Mat, bool), b: (&Mat, bool), c: &mut Mat) -> Result<()> {
    let (m, k) = op_shape(a.0, a.1);
    let (k2, n) = op_shape(b.0, b.1);
    check_dim("gemm inner dimension", k, k2)?;
    check_dim("gemm output rows", c.rows, m)?;
    check_dim("gemm output cols", c.cols, n)?;
    if m == 0 || n == 0 || k == 0 {
        return Ok(());
    }
    backend::gemm(alpha, a, b, c);
    Ok(())
}

#[cfg(not(feature = "blas"))]
mod backend {
    use super::Mat;

    pub fn gemm(alpha: f64, a: (&Mat, bool), b: (&Mat, bool), c: &mut Mat) {
        let (a, ta) = a;
        let (b, tb) = b;
        let (m, n) = (c.rows, c.cols);
        let k = if ta { a.rows } else { a.cols };
        for i in 0..m {
            for p in 0..k {
                let aip = if ta {
                    a.data[p * a.cols + i]
                } else {
                    a.data[i * a.cols + p]
                };
                let aip = alpha * aip;
                let c_row = &mut c.data[i * n..(i + 1) * n];
                if tb {
                    for (j, cij) in c_row.iter_mut().enumerate() {
                        *cij += aip * b.data[j * b.cols + p];
                    }
                } else {
                    let b_row = &b.data[p * b.cols..(p + 1) * b.cols];
                    for (cij, &bpj) in c_row.iter_mut().zip(b_row) {
                        *cij += aip * bpj;
                    }
                }
            }
        }
    }

    pub fn gemv(transpose: bool, alpha: f64, a: &Mat, x: &[f64], y: &mut [f64]) {
        for (r, row) in a.iter_rows().enumerate() {
            if transpose {
                let scaled = alpha * x[r];
                for (yc, &arc) in y.iter_mut().zip(row) {
                    *yc += scaled * arc;
                }
            } else {
                let dot: f64 = row.iter().zip(x).map(|(a, x)| a * x).sum();
                y[r] += alpha * dot;
            }
        }
    }

    pub fn ger(alpha: f64, x: &[f64], y: &[f64], a: &mut Mat) {
        let cols = a.cols;
        for (r, &xr) in x.iter().enumerate() {
            let row = &mut a.data[r * cols..(r + 1) * cols];
            for (arc, &yc) in row.iter_mut().zip(y) {
                *arc += alpha * xr * yc;
            }
        }
    }
}

#[cfg(feature = "blas")]
mod backend {
    use super::Mat;

    use rblas::attribute::{Order, Transpose};
    use rblas::matrix::ops::Gemm;
    use rblas::matrix_vector::ops::{Gemv, Ger};
    use rblas::Matrix;
    use std::os::raw::c_int;

    impl Matrix<f64> for Mat {
        fn rows(&self) -> c_int {
            self.rows as c_int
        }

        fn cols(&self) -> c_int {
            self.cols as c_int
        }

        fn as_ptr(&self) -> *const f64 {
            self.data.as_ptr()
        }

        fn as_mut_ptr(&mut self) -> *mut f64 {
            self.data.as_mut_ptr()
        }

        fn order(&self) -> Order {
            Order::RowMajor
        }
    }

    fn trans(transpose: bool) -> Transpose {
        if transpose {
            Transpose::Trans
        } else {
            Transpose::NoTrans
        }
    }

    pub fn gemm(alpha: f64, a: (&Mat, bool), b: (&Mat, bool), c: &mut Mat) {
        f64::gemm(&alpha, trans(a.1), a.0, trans(b.1), b.0, &1.0, c);
    }

    pub fn gemv(transpose: bool, alpha: f64, a: &Mat, x: &[f64], y: &mut [f64]) {
        f64::gemv(trans(transpose), &alpha, a, x, &1.0, y);
    }

    pub fn ger(alpha: f64, x: &[f64], y: &[f64], a: &mut Mat) {
        f64::ger(&alpha, x, y, a);
    }
}
