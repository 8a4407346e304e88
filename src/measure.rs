//! The measurement constraint codec and child layout requests.
//!
//! A [`MeasureSpec`] is the constraint a parent hands a child during the
//! measure pass, packed into a single `u32`: the top two bits carry the
//! mode and the remaining 30 bits carry the size. Packing keeps the
//! per-node spec cache and the spec-equality fast path cheap.

const MODE_SHIFT: u32 = 30;
const MODE_MASK: u32 = 0x3 << MODE_SHIFT;

/// The maximum representable spec size (exclusive).
pub const MAX_SPEC_SIZE: u32 = 1 << MODE_SHIFT;

/// How a [`MeasureSpec`]'s size is to be interpreted by the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecMode {
    /// The parent imposes no constraint; the child may be any size.
    Unspecified,
    /// The child must be exactly the given size.
    Exactly,
    /// The child may be at most the given size.
    AtMost,
}

/// A packed (size, mode) measurement constraint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeasureSpec(u32);

impl MeasureSpec {
    /// Pack a size and mode into a spec. Sizes at or above
    /// [`MAX_SPEC_SIZE`] are truncated to the low 30 bits.
    pub fn make(size: u32, mode: SpecMode) -> Self {
        let m = match mode {
            SpecMode::Unspecified => 0,
            SpecMode::Exactly => 1 << MODE_SHIFT,
            SpecMode::AtMost => 2 << MODE_SHIFT,
        };
        Self((size & !MODE_MASK) | m)
    }

    /// An unconstrained spec.
    pub fn unspecified() -> Self {
        Self::make(0, SpecMode::Unspecified)
    }

    /// An exact-size spec.
    pub fn exactly(size: u32) -> Self {
        Self::make(size, SpecMode::Exactly)
    }

    /// An upper-bound spec.
    pub fn at_most(size: u32) -> Self {
        Self::make(size, SpecMode::AtMost)
    }

    /// The mode packed into this spec.
    pub fn mode(self) -> SpecMode {
        match self.0 & MODE_MASK {
            0 => SpecMode::Unspecified,
            m if m == 1 << MODE_SHIFT => SpecMode::Exactly,
            _ => SpecMode::AtMost,
        }
    }

    /// The size packed into this spec.
    pub fn size(self) -> u32 {
        self.0 & !MODE_MASK
    }
}

impl std::fmt::Debug for MeasureSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MeasureSpec({:?}, {})", self.mode(), self.size())
    }
}

/// A node's layout request for one dimension, read by its parent when
/// resolving child constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizePolicy {
    /// Request exactly this many pixels.
    Exact(u32),
    /// Request all the space the parent can offer.
    FillParent,
    /// Request only as much space as the content needs.
    WrapContent,
}

/// Margins around a child, consumed by parents that honor them during
/// measurement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Margins {
    /// Space demanded to the left of the child.
    pub left: i32,
    /// Space demanded above the child.
    pub top: i32,
    /// Space demanded to the right of the child.
    pub right: i32,
    /// Space demanded below the child.
    pub bottom: i32,
}

/// Per-child layout parameters, assigned when a child is added to a
/// composite and read back during its parent's measure pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutParams {
    /// Requested width.
    pub width: SizePolicy,
    /// Requested height.
    pub height: SizePolicy,
    /// Requested margins.
    pub margins: Margins,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self::wrap()
    }
}

impl LayoutParams {
    /// Wrap-content in both dimensions, the default generated for
    /// children added without explicit params.
    pub fn wrap() -> Self {
        Self {
            width: SizePolicy::WrapContent,
            height: SizePolicy::WrapContent,
            margins: Margins::default(),
        }
    }

    /// Fill-parent in both dimensions.
    pub fn fill() -> Self {
        Self {
            width: SizePolicy::FillParent,
            height: SizePolicy::FillParent,
            margins: Margins::default(),
        }
    }

    /// Exact pixel sizes in both dimensions.
    pub fn exact(width: u32, height: u32) -> Self {
        Self {
            width: SizePolicy::Exact(width),
            height: SizePolicy::Exact(height),
            margins: Margins::default(),
        }
    }
}

/// Resolve the constraint to pass to a child for one dimension, given
/// the parent's own constraint, the space the parent has already
/// consumed (padding, margins, siblings), and the child's request.
///
/// This is the core of constraint propagation and follows a fixed
/// decision table: an exactly-sized parent grants exact sizes, a bounded
/// parent grants upper bounds, and an unconstrained parent can promise
/// nothing for fill/wrap requests.
pub fn child_measure_spec(spec: MeasureSpec, consumed: i32, policy: SizePolicy) -> MeasureSpec {
    let available = (spec.size() as i32 - consumed).max(0) as u32;
    match spec.mode() {
        SpecMode::Exactly => match policy {
            SizePolicy::Exact(n) => MeasureSpec::exactly(n),
            SizePolicy::FillParent => MeasureSpec::exactly(available),
            SizePolicy::WrapContent => MeasureSpec::at_most(available),
        },
        SpecMode::AtMost => match policy {
            SizePolicy::Exact(n) => MeasureSpec::exactly(n),
            SizePolicy::FillParent => MeasureSpec::at_most(available),
            SizePolicy::WrapContent => MeasureSpec::at_most(available),
        },
        SpecMode::Unspecified => match policy {
            SizePolicy::Exact(n) => MeasureSpec::exactly(n),
            SizePolicy::FillParent => MeasureSpec::make(0, SpecMode::Unspecified),
            SizePolicy::WrapContent => MeasureSpec::make(0, SpecMode::Unspecified),
        },
    }
}

/// Reconcile a desired size with a constraint: unconstrained keeps the
/// desired size, an upper bound clamps it, an exact constraint wins
/// outright.
pub fn resolve_size(size: u32, spec: MeasureSpec) -> u32 {
    match spec.mode() {
        SpecMode::Unspecified => size,
        SpecMode::AtMost => size.min(spec.size()),
        SpecMode::Exactly => spec.size(),
    }
}

/// The default measured size for a node with no content hook: the
/// fallback when unconstrained, otherwise whatever the spec carries.
pub fn default_size(default: u32, spec: MeasureSpec) -> u32 {
    match spec.mode() {
        SpecMode::Unspecified => default,
        SpecMode::AtMost | SpecMode::Exactly => spec.size(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_round_trip() {
        let modes = [SpecMode::Unspecified, SpecMode::Exactly, SpecMode::AtMost];
        let sizes = [0u32, 1, 2, 63, 64, 1000, 0xFFFF, MAX_SPEC_SIZE - 2, MAX_SPEC_SIZE - 1];
        for &mode in &modes {
            for &size in &sizes {
                let spec = MeasureSpec::make(size, mode);
                assert_eq!(spec.size(), size, "size round-trip for {spec:?}");
                assert_eq!(spec.mode(), mode, "mode round-trip for {spec:?}");
            }
        }
    }

    #[test]
    fn spec_equality_is_bitwise() {
        assert_eq!(MeasureSpec::exactly(10), MeasureSpec::make(10, SpecMode::Exactly));
        assert_ne!(MeasureSpec::exactly(10), MeasureSpec::at_most(10));
        assert_ne!(MeasureSpec::exactly(10), MeasureSpec::exactly(11));
    }

    #[test]
    fn child_spec_table() {
        use SizePolicy::*;
        let pad = 10;
        let cases = [
            // (parent spec, child policy, expected)
            (MeasureSpec::exactly(100), Exact(30), MeasureSpec::exactly(30)),
            (MeasureSpec::exactly(100), FillParent, MeasureSpec::exactly(90)),
            (MeasureSpec::exactly(100), WrapContent, MeasureSpec::at_most(90)),
            (MeasureSpec::at_most(100), Exact(30), MeasureSpec::exactly(30)),
            (MeasureSpec::at_most(100), FillParent, MeasureSpec::at_most(90)),
            (MeasureSpec::at_most(100), WrapContent, MeasureSpec::at_most(90)),
            (MeasureSpec::unspecified(), Exact(30), MeasureSpec::exactly(30)),
            (
                MeasureSpec::unspecified(),
                FillParent,
                MeasureSpec::make(0, SpecMode::Unspecified),
            ),
            (
                MeasureSpec::unspecified(),
                WrapContent,
                MeasureSpec::make(0, SpecMode::Unspecified),
            ),
        ];
        for (parent, policy, want) in cases {
            let got = child_measure_spec(parent, pad, policy);
            assert_eq!(got, want, "parent={parent:?} policy={policy:?}");
        }
    }

    #[test]
    fn child_spec_clamps_consumed_space() {
        let spec = child_measure_spec(MeasureSpec::exactly(5), 10, SizePolicy::FillParent);
        assert_eq!(spec, MeasureSpec::exactly(0));
    }

    #[test]
    fn resolve_and_default() {
        assert_eq!(resolve_size(50, MeasureSpec::unspecified()), 50);
        assert_eq!(resolve_size(50, MeasureSpec::at_most(30)), 30);
        assert_eq!(resolve_size(50, MeasureSpec::at_most(80)), 50);
        assert_eq!(resolve_size(50, MeasureSpec::exactly(80)), 80);

        assert_eq!(default_size(7, MeasureSpec::unspecified()), 7);
        assert_eq!(default_size(7, MeasureSpec::at_most(42)), 42);
        assert_eq!(default_size(7, MeasureSpec::exactly(42)), 42);
    }
}
