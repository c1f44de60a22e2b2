use std::fmt::{self, Display};

/// The largest magnitude of a numerator or denominator.
pub const MAX: i16 = i16::MAX;

/// A real value carried as an integer numerator/denominator pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    num: i16,
    den: i16,
}

impl Fraction {
    /// Creates a new `Fraction`.
    ///
    /// # Arguments
    /// * `num` - The numerator.
    /// * `den` - The denominator.
    ///
    /// # Returns
    /// `None` if the denominator is zero.
    pub fn new(num: i16, den: i16) -> Option<Self> {
        (den != 0).then_some(Self { num, den })
    }

    pub fn num(&self) -> i16 {
        self.num
    }

    pub fn den(&self) -> i16 {
        self.den
    }

    pub fn value(&self) -> f32 {
        self.num as f32 / self.den as f32
    }

    /// Finds the fraction closest to `x` whose numerator and denominator magnitudes do not
    /// exceed `MAX`.
    ///
    /// The search walks the Stern-Brocot tree from the bracket `floor(x)/1 <= x <= (floor(x)+1)/1`,
    /// replacing one side by the mediant until the mediant stops being representable. Any
    /// fraction strictly inside the final bracket has larger terms than the mediant, so the
    /// nearer side of the bracket is the best representable approximation.
    ///
    /// `x` is clamped to `[-MAX, MAX]` and NaN is treated as zero.
    pub fn approximate(x: f32) -> Self {
        let max = MAX as f64;
        let x = if x.is_nan() {
            0.
        } else {
            (x as f64).clamp(-max, max)
        };

        let mut a = x.floor() as i64;
        let mut b = 1i64;
        if x == a as f64 {
            return Self::from_terms(a, b);
        }

        let mut c = a + 1;
        let mut d = 1i64;

        loop {
            let (p, q) = (a + c, b + d);
            if !representable(p, q) {
                break;
            }

            let m = p as f64 / q as f64;
            if x == m {
                return Self::from_terms(p, q);
            } else if x > m {
                (a, b) = (p, q);
            } else {
                (c, d) = (p, q);
            }
        }

        if x - a as f64 / b as f64 <= c as f64 / d as f64 - x {
            Self::from_terms(a, b)
        } else {
            Self::from_terms(c, d)
        }
    }

    // Callers only pass representable terms.
    fn from_terms(num: i64, den: i64) -> Self {
        Self {
            num: num as i16,
            den: den as i16,
        }
    }
}

fn representable(num: i64, den: i64) -> bool {
    num.abs() <= MAX as i64 && den <= MAX as i64
}

impl Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
