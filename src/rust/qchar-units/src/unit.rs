// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

pub(crate) fn round_to_significant_digits(x: f64, n: u32) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        let order = x.abs().log10().floor();
        let scale = 10f64.powf((n as f64) - 1.0 - order);
        (x * scale).round() / scale
    }
}

/// Declares a quantity type carrying its unit as a zero-sized marker.
///
/// The generated type supports the arithmetic needed for sequencing: sums and
/// differences of like quantities, scaling by a plain number and ordering.
#[macro_export]
macro_rules! quantity {
    ($ident:ident) => {
        /// A quantity represented with unit type.
        ///
        /// # Type Parameter
        /// - `U`: The unit of the value. Typically a zero-sized type.
        /// - `T`: The underlying value (typically a floating point number)
        #[derive(std::clone::Clone, std::marker::Copy, std::default::Default, core::fmt::Debug)]
        pub struct $ident<U, T = f64> {
            pub(crate) value: T,
            pub(crate) unit: U,
        }

        impl<U, T> $ident<U, T> {
            pub fn value(self) -> T {
                self.value
            }
        }

        impl<T: num_traits::Zero + std::cmp::PartialEq, U> PartialEq for $ident<U, T> {
            fn eq(&self, other: &Self) -> bool {
                // +0.0 and -0.0 compare equal, so does every other pair `==` accepts
                (self.value.is_zero() && other.value.is_zero()) || self.value == other.value
            }
        }

        impl<T: num_traits::Zero + std::cmp::PartialEq, U> Eq for $ident<U, T> {}

        impl<T: num_traits::Zero + std::cmp::PartialOrd, U> PartialOrd for $ident<U, T> {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl<T: num_traits::Zero + std::cmp::PartialOrd, U> Ord for $ident<U, T> {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                if self.value < other.value {
                    std::cmp::Ordering::Less
                } else if self.value > other.value {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            }
        }

        impl<U, T> std::ops::Add for $ident<U, T>
        where
            T: std::ops::Add<Output = T> + std::marker::Copy,
            U: std::marker::Copy,
        {
            type Output = Self;

            fn add(self, rhs: Self) -> Self::Output {
                $ident {
                    value: self.value + rhs.value,
                    unit: self.unit,
                }
            }
        }

        impl<U, T> std::ops::AddAssign for $ident<U, T>
        where
            T: std::ops::AddAssign + std::marker::Copy,
        {
            fn add_assign(&mut self, rhs: Self) {
                self.value += rhs.value;
            }
        }

        impl<U, T> std::ops::Sub for $ident<U, T>
        where
            T: std::ops::Sub<Output = T> + std::marker::Copy,
            U: std::marker::Copy,
        {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self::Output {
                $ident {
                    value: self.value - rhs.value,
                    unit: self.unit,
                }
            }
        }

        impl<U, T> std::ops::Mul<T> for $ident<U, T>
        where
            T: std::ops::Mul<T, Output = T> + std::marker::Copy,
            U: std::marker::Copy,
        {
            type Output = Self;

            fn mul(self, rhs: T) -> Self::Output {
                $ident {
                    value: self.value * rhs,
                    unit: self.unit,
                }
            }
        }

        impl<U, T> std::ops::Div<T> for $ident<U, T>
        where
            T: std::ops::Div<T, Output = T> + std::marker::Copy,
            U: std::marker::Copy,
        {
            type Output = Self;

            fn div(self, rhs: T) -> Self::Output {
                $ident {
                    value: self.value / rhs,
                    unit: self.unit,
                }
            }
        }

        impl<U, T> std::iter::Sum for $ident<U, T>
        where
            T: num_traits::Zero + std::marker::Copy,
            U: std::default::Default,
        {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                $ident {
                    value: iter.fold(T::zero(), |acc, q| acc + q.value),
                    unit: U::default(),
                }
            }
        }

        impl<U, T> std::fmt::Display for $ident<U, T>
        where
            T: std::fmt::Display
                + std::fmt::Debug
                + num_traits::AsPrimitive<f64>
                + num_traits::Float,
            U: std::fmt::Display,
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if f.alternate() {
                    std::fmt::Display::fmt(&self.value, f)?;
                } else {
                    // Debug formatting picks scientific notation where it helps. Rounding a
                    // few digits below epsilon hides accumulated rounding errors.
                    let significand_digits = (-T::epsilon().log10() - T::one()).as_() as u32;
                    let value = $crate::unit::round_to_significant_digits(
                        self.value.as_(),
                        significand_digits,
                    );
                    std::fmt::Debug::fmt(&value, f)?;
                }
                write!(f, " ")?;
                self.unit.fmt(f)
            }
        }

        impl<T, U> From<T> for $ident<U, T>
        where
            T: num_traits::Num,
            U: std::default::Default,
        {
            fn from(value: T) -> Self {
                $ident {
                    value,
                    unit: U::default(),
                }
            }
        }

        impl<U> From<$ident<U, f64>> for f64 {
            fn from(value: $ident<U, f64>) -> Self {
                value.value
            }
        }

        impl<U, T> num_traits::Zero for $ident<U, T>
        where
            T: num_traits::Zero + std::marker::Copy,
            U: std::marker::Copy + std::default::Default,
        {
            fn zero() -> Self {
                Self {
                    value: T::zero(),
                    unit: U::default(),
                }
            }

            fn is_zero(&self) -> bool {
                self.value.is_zero()
            }
        }
    };
}
