use std::fmt;

/// A permutation of `{0, ..., n-1}` for `n <= 5`, which covers the vertex
/// relabellings needed to glue facets of triangles, tetrahedra and pentachora.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Perm {
    images: [u8; 5],
    n: u8,
}

pub const MAX_POINTS: usize = 5;

impl Perm {
    pub fn identity(n: usize) -> Perm {
        assert!(n <= MAX_POINTS);
        Perm { images: [0, 1, 2, 3, 4], n: n as u8 }
    }

    /// Builds a permutation from its images. Returns None unless `images` is a
    /// genuine permutation of `0..images.len()`.
    pub fn from_images(images: &[u8]) -> Option<Perm> {
        let n = images.len();
        if n > MAX_POINTS {
            return None;
        }

        let mut seen = [false; MAX_POINTS];
        let mut perm = Perm::identity(n);
        for (i, &image) in images.iter().enumerate() {
            let image_idx = image as usize;
            if image_idx >= n || seen[image_idx] {
                return None;
            }
            seen[image_idx] = true;
            perm.images[i] = image;
        }

        Some(perm)
    }

    /// Parses a packed image string such as `"1032"`.
    pub fn parse(text: &str) -> Option<Perm> {
        let digits: Option<Vec<u8>> = text.chars().map(|c| c.to_digit(10).map(|d| d as u8)).collect();
        Perm::from_images(&digits?)
    }

    pub fn transposition(n: usize, a: usize, b: usize) -> Perm {
        let mut perm = Perm::identity(n);
        perm.images.swap(a, b);
        perm
    }

    pub fn size(&self) -> usize {
        self.n as usize
    }

    pub fn apply(&self, i: usize) -> usize {
        self.images[i] as usize
    }

    pub fn pre_image(&self, i: usize) -> usize {
        self.images[..self.size()].iter().position(|&x| x as usize == i).unwrap_or(i)
    }

    pub fn images(&self) -> &[u8] {
        &self.images[..self.size()]
    }

    pub fn inverse(&self) -> Perm {
        let mut inv = Perm::identity(self.size());
        for i in 0..self.size() {
            inv.images[self.images[i] as usize] = i as u8;
        }
        inv
    }

    /// `self ∘ other`, i.e. apply `other` first.
    pub fn compose(&self, other: &Perm) -> Perm {
        debug_assert_eq!(self.n, other.n);
        let mut result = Perm::identity(self.size());
        for i in 0..self.size() {
            result.images[i] = self.images[other.images[i] as usize];
        }
        result
    }

    pub fn sign(&self) -> i32 {
        let mut inversions = 0;
        for i in 0..self.size() {
            for j in (i + 1)..self.size() {
                if self.images[i] > self.images[j] {
                    inversions+= 1;
                }
            }
        }
        if inversions % 2 == 0 { 1 } else { -1 }
    }

    pub fn is_identity(&self) -> bool {
        (0..self.size()).all(|i| self.images[i] as usize == i)
    }

    /// Every permutation of `n` points in lexicographic order of images.
    pub fn all(n: usize) -> Vec<Perm> {
        fn extend(prefix: &mut Vec<u8>, n: usize, out: &mut Vec<Perm>) {
            if prefix.len() == n {
                if let Some(p) = Perm::from_images(prefix) {
                    out.push(p);
                }
                return;
            }
            for i in 0..n as u8 {
                if !prefix.contains(&i) {
                    prefix.push(i);
                    extend(prefix, n, out);
                    prefix.pop();
                }
            }
        }

        let mut out = Vec::new();
        extend(&mut Vec::with_capacity(n), n, &mut out);
        out
    }

    /* Sn order is lexicographic order with each pair (2k, 2k+1) swapped
     * where needed so that even positions hold even permutations */
    fn sn_adjust(lexicographic: usize, perm: &Perm) -> usize {
        if (lexicographic % 2 == 0) == (perm.sign() == 1) {
            lexicographic
        } else {
            lexicographic ^ 1
        }
    }

    /// Position of this permutation in the alternating-sign order used by
    /// data files, where even positions hold even permutations.
    pub fn sn_index(&self) -> usize {
        let lexicographic = Perm::all(self.size()).iter().position(|p| p == self).unwrap_or(0);
        Perm::sn_adjust(lexicographic, self)
    }

    pub fn from_sn_index(n: usize, index: usize) -> Option<Perm> {
        let all = Perm::all(n);
        let candidate = all.get(index)?;
        all.get(Perm::sn_adjust(index, candidate)).copied()
    }

    fn pack_bits(n: usize) -> usize {
        if n <= 4 { 2 } else { 3 }
    }

    /// The images packed into one integer, lowest bits first.
    pub fn image_pack(&self) -> u32 {
        let bits = Perm::pack_bits(self.size());
        self.images().iter().enumerate().map(|(i, &image)| (image as u32) << (bits * i)).sum()
    }

    pub fn from_image_pack(n: usize, pack: u32) -> Option<Perm> {
        let bits = Perm::pack_bits(n);
        if n > MAX_POINTS || (pack as u64) >> (bits * n) != 0 {
            return None;
        }
        let mask = (1 << bits) - 1;
        let images: Vec<u8> = (0..n).map(|i| ((pack >> (bits * i)) & mask) as u8).collect();
        Perm::from_images(&images)
    }
}

impl fmt::Display for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in self.images() {
            write!(f, "{}", i)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Perm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Perm({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composition_and_inverse() {
        let p = Perm::parse("1203").unwrap();
        let q = Perm::parse("3012").unwrap();
        assert!(p.compose(&p.inverse()).is_identity());
        assert_eq!(p.compose(&q).apply(0), p.apply(q.apply(0)));
        assert_eq!(p.pre_image(2), 1);
    }

    #[test]
    fn rejects_non_permutations() {
        assert_eq!(Perm::parse("0012"), None);
        assert_eq!(Perm::parse("0124"), None);
        assert_eq!(Perm::parse("01x2"), None);
    }

    #[test]
    fn signs() {
        assert_eq!(Perm::identity(4).sign(), 1);
        assert_eq!(Perm::transposition(4, 2, 3).sign(), -1);
        assert_eq!(Perm::parse("1230").unwrap().sign(), -1);
        assert_eq!(Perm::all(4).len(), 24);
        assert_eq!(Perm::all(5).iter().filter(|p| p.sign() == 1).count(), 60);
    }

    #[test]
    fn sn_order_alternates_sign() {
        let s3: Vec<String> = (0..6).map(|i| Perm::from_sn_index(3, i).unwrap().to_string()).collect();
        assert_eq!(s3, vec!["012", "021", "120", "102", "201", "210"]);
        for (i, p) in (0..24).map(|i| (i, Perm::from_sn_index(4, i).unwrap())) {
            assert_eq!(p.sign() == 1, i % 2 == 0);
            assert_eq!(p.sn_index(), i);
        }
        assert_eq!(Perm::from_sn_index(3, 6), None);
    }

    #[test]
    fn image_packs() {
        assert_eq!(Perm::identity(4).image_pack(), 228);
        assert_eq!(Perm::from_image_pack(4, 225), Some(Perm::parse("1023").unwrap()));
        assert_eq!(Perm::from_image_pack(5, Perm::parse("43210").unwrap().image_pack()), Perm::parse("43210"));
        /* repeated images and stray high bits */
        assert_eq!(Perm::from_image_pack(4, 0), None);
        assert_eq!(Perm::from_image_pack(4, 228 + 256), None);
    }
}
