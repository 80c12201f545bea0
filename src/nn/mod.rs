//! Small owned-parameter networks: enough to train the pipeline's
//! feed-forward and recurrent models without an external framework.

mod act;
mod loss;
mod mlp;
mod recurrent;

pub use act::ActFn;
pub use loss::Loss;
pub use mlp::Mlp;
pub use recurrent::Recurrent;

use ndarray::{Array2, ArrayView1, Axis};

/// Outer product of two vectors, used to build weight gradients.
pub(crate) fn outer(v: ArrayView1<f32>, w: ArrayView1<f32>) -> Array2<f32> {
    let v = v.insert_axis(Axis(1));
    let w = w.insert_axis(Axis(0));
    v.dot(&w)
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn outer_product_of_vectors() {
        let a = Array1::<f32>::from_vec(vec![1., 2., 3.]);
        let expected =
            Array2::<f32>::from_shape_vec((3, 3), vec![1., 2., 3., 2., 4., 6., 3., 6., 9.])
                .unwrap();
        assert_eq!(outer(a.view(), a.view()), expected);
    }
}
