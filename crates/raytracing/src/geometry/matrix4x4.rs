use std::ops::Index;

use super::Vec3;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix4x4 {
    // row-major
    pub data: [[f32; 4]; 4],
}

impl Index<usize> for Matrix4x4 {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.data[index / 4][index % 4]
    }
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Matrix4x4::identity()
    }
}

impl Matrix4x4 {
    pub fn identity() -> Self {
        Matrix4x4 {
            data: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    #[allow(clippy::too_many_arguments)]
    #[rustfmt::skip]
    pub fn create(a11: f32, a12: f32, a13: f32, a14: f32,
                  a21: f32, a22: f32, a23: f32, a24: f32,
                  a31: f32, a32: f32, a33: f32, a34: f32,
                  a41: f32, a42: f32, a43: f32, a44: f32) -> Self {
        Matrix4x4 {
            data: [[a11, a12, a13, a14],
                   [a21, a22, a23, a24],
                   [a31, a32, a33, a34],
                   [a41, a42, a43, a44]]
        }
    }

    /// Basis vectors become columns, with `origin` as the translation column
    #[rustfmt::skip]
    pub fn create_from_basis(x: Vec3, y: Vec3, z: Vec3, origin: Vec3) -> Self {
        Matrix4x4::create(
            x.0, y.0, z.0, origin.0,
            x.1, y.1, z.1, origin.1,
            x.2, y.2, z.2, origin.2,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    pub fn column(&self, j: usize) -> Vec3 {
        Vec3(self.data[0][j], self.data[1][j], self.data[2][j])
    }

    /// Gauss-Jordan elimination with partial pivoting.
    /// Returns `None` if the matrix is singular.
    pub fn invert(&self) -> Option<Self> {
        const SINGULAR_EPSILON: f32 = 1e-12;

        let mut a = self.data;
        let mut inv = Matrix4x4::identity().data;

        for col in 0..4 {
            let pivot = (col..4)
                .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
                .unwrap_or(col);

            if a[pivot][col].abs() < SINGULAR_EPSILON {
                return None;
            }

            a.swap(col, pivot);
            inv.swap(col, pivot);

            let scale = 1.0 / a[col][col];
            for k in 0..4 {
                a[col][k] *= scale;
                inv[col][k] *= scale;
            }

            for row in 0..4 {
                if row == col {
                    continue;
                }
                let factor = a[row][col];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..4 {
                    a[row][k] -= factor * a[col][k];
                    inv[row][k] -= factor * inv[col][k];
                }
            }
        }

        Some(Matrix4x4 { data: inv })
    }

    pub fn matmul(a: Matrix4x4, b: Matrix4x4) -> Self {
        let mut m = Matrix4x4::identity();
        for i in 0..4 {
            for j in 0..4 {
                m.data[i][j] = (0..4).map(|k| a.data[i][k] * b.data[k][j]).sum();
            }
        }
        m
    }

    pub fn translation(direction: Vec3) -> Matrix4x4 {
        let mut me = Self::identity();
        me.data[0][3] = direction.0;
        me.data[1][3] = direction.1;
        me.data[2][3] = direction.2;

        me
    }

    pub fn scale(scale: Vec3) -> Matrix4x4 {
        let mut me = Self::identity();
        me.data[0][0] = scale.0;
        me.data[1][1] = scale.1;
        me.data[2][2] = scale.2;

        me
    }

    // rotate theta counterclockwise about the unit axis v (right-handed)
    pub fn rotation(theta: f32, v: Vec3) -> Matrix4x4 {
        let v = v.unit();
        let rotate_u_about_v = |u: Vec3| {
            let v_c = v * Vec3::dot(u, v);
            let v1 = u - v_c;
            let v2 = Vec3::cross(v, v1);

            v_c + v1 * f32::cos(theta) + v2 * f32::sin(theta)
        };

        Matrix4x4::create_from_basis(
            rotate_u_about_v(Vec3(1.0, 0.0, 0.0)),
            rotate_u_about_v(Vec3(0.0, 1.0, 0.0)),
            rotate_u_about_v(Vec3(0.0, 0.0, 1.0)),
            Vec3::zero(),
        )
    }
}

impl Matrix4x4 {
    /// Transforms `p` as a homogeneous point (w = 1)
    pub fn apply_point(&self, p: Vec3) -> Vec3 {
        let row = |i: usize| {
            self.data[i][0] * p.0
                + self.data[i][1] * p.1
                + self.data[i][2] * p.2
                + self.data[i][3]
        };
        let w = row(3);
        if w == 1.0 || w == 0.0 {
            Vec3(row(0), row(1), row(2))
        } else {
            Vec3(row(0) / w, row(1) / w, row(2) / w)
        }
    }

    /// Transforms `v` as a direction (w = 0)
    pub fn apply_vector(&self, v: Vec3) -> Vec3 {
        let a = self.data[0][0] * v.0 + self.data[0][1] * v.1 + self.data[0][2] * v.2;
        let b = self.data[1][0] * v.0 + self.data[1][1] * v.1 + self.data[1][2] * v.2;
        let c = self.data[2][0] * v.0 + self.data[2][1] * v.1 + self.data[2][2] * v.2;
        Vec3(a, b, c)
    }

    // used for calculation of normals
    pub fn apply_vector_transposed(&self, v: Vec3) -> Vec3 {
        let a = self.data[0][0] * v.0 + self.data[1][0] * v.1 + self.data[2][0] * v.2;
        let b = self.data[0][1] * v.0 + self.data[1][1] * v.1 + self.data[2][1] * v.2;
        let c = self.data[0][2] * v.0 + self.data[1][2] * v.1 + self.data[2][2] * v.2;
        Vec3(a, b, c)
    }
}
