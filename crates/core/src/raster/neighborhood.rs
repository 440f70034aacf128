//! Neighbourhood offsets shared by focal and hydrology kernels

/// Relative `(row, col)` offsets of a square window, centre included.
pub fn square_offsets(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let mut offsets = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
    for dr in -r..=r {
        for dc in -r..=r {
            offsets.push((dr, dc));
        }
    }
    offsets
}

/// D8 flow direction encoding.
///
/// ```text
///   4  3  2
///   5  0  1
///   6  7  8
/// ```
pub mod d8 {
    /// `(row, col)` offsets for codes 1..=8 (index = code - 1)
    pub const OFFSETS: [(isize, isize); 8] = [
        (0, 1),   // 1: E
        (-1, 1),  // 2: NE
        (-1, 0),  // 3: N
        (-1, -1), // 4: NW
        (0, -1),  // 5: W
        (1, -1),  // 6: SW
        (1, 0),   // 7: S
        (1, 1),   // 8: SE
    ];

    /// Distance multipliers matching `OFFSETS`
    pub const DISTANCES: [f64; 8] = [
        1.0,
        std::f64::consts::SQRT_2,
        1.0,
        std::f64::consts::SQRT_2,
        1.0,
        std::f64::consts::SQRT_2,
        1.0,
        std::f64::consts::SQRT_2,
    ];

    /// Downstream cell for `code`, or `None` for pits and off-grid targets.
    pub fn downstream(code: u8, row: usize, col: usize, rows: usize, cols: usize) -> Option<(usize, usize)> {
        if code == 0 || code > 8 {
            return None;
        }
        let (dr, dc) = OFFSETS[(code - 1) as usize];
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
            return None;
        }
        Some((nr as usize, nc as usize))
    }
}
