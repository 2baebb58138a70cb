use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

/// Precomputed mapping from dest pixels to nearest src pixels
pub struct ScaleLut {
    src_x: Vec<usize>,
    src_row: Vec<usize>,
}

impl ScaleLut {
    pub fn empty() -> Self {
        Self {
            src_x: Vec::new(),
            src_row: Vec::new(),
        }
    }

    pub fn dst_width(&self) -> usize {
        self.src_x.len()
    }

    pub fn dst_height(&self) -> usize {
        self.src_row.len()
    }
}

pub fn build_scale_lut(dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> ScaleLut {
    let map_axis = |dst: usize, src: usize| -> Vec<usize> {
        (0..dst)
            .map(|i| ((i * src) / dst.max(1)).min(src.saturating_sub(1)))
            .collect()
    };

    ScaleLut {
        src_x: map_axis(dst_w, src_w),
        // Row offsets rather than indices
        src_row: map_axis(dst_h, src_h)
            .into_iter()
            .map(|y| y * src_w)
            .collect(),
    }
}

/// Parallel nearest-neighbour stretch.
/// Rows are processed in parallel for cache friendly writes; keeps the
/// debug overlay's one-pixel lines crisp.
pub fn blit_nearest(dst: &mut [u32], dw: usize, src: &[u32], lut: &ScaleLut) {
    if dw == 0 || src.is_empty() {
        return;
    }
    dst.par_chunks_mut(dw)
        .take(lut.dst_height())
        .enumerate()
        .for_each(|(y, dst_row)| {
            let row = lut.src_row[y];
            for (out, &sx) in dst_row.iter_mut().zip(&lut.src_x) {
                *out = src[row + sx];
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubling_repeats_pixels() {
        let src = [1, 2, 3, 4];
        let lut = build_scale_lut(4, 4, 2, 2);
        let mut dst = vec![0; 16];
        blit_nearest(&mut dst, 4, &src, &lut);
        assert_eq!(
            dst,
            vec![1, 1, 2, 2, 1, 1, 2, 2, 3, 3, 4, 4, 3, 3, 4, 4]
        );
    }

    #[test]
    fn empty_source_leaves_destination_untouched() {
        let lut = build_scale_lut(8, 6, 0, 4);
        let mut dst = vec![7; 48];
        blit_nearest(&mut dst, 8, &[], &lut);
        assert!(dst.iter().all(|&p| p == 7));
    }

    #[test]
    fn shrinking_stays_in_bounds() {
        let src: Vec<u32> = (0..12).collect();
        let lut = build_scale_lut(2, 1, 4, 3);
        let mut dst = vec![0; 2];
        blit_nearest(&mut dst, 2, &src, &lut);
        assert_eq!(dst, vec![0, 2]);
    }
}
