use std::{fmt, marker::PhantomData};

pub trait Flag: Copy + 'static {
    const ALL: &'static [Self];
    fn mask(self) -> u8;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VtxFlag {
    Removed,
    /// Removed during the operation in progress; folded into `Removed` when it completes.
    RemovedNew,
    Processed,
    Surface,
}

impl Flag for VtxFlag {
    const ALL: &'static [Self] = &[VtxFlag::Removed, VtxFlag::RemovedNew, VtxFlag::Processed, VtxFlag::Surface];
    #[inline]
    fn mask(self) -> u8 {
        match self {
            VtxFlag::Removed => 0b0001,
            VtxFlag::RemovedNew => 0b0010,
            VtxFlag::Processed => 0b0100,
            VtxFlag::Surface => 0b1000,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TetFlag {
    Removed,
    RemovedNew,
    Processed,
}

impl Flag for TetFlag {
    const ALL: &'static [Self] = &[TetFlag::Removed, TetFlag::RemovedNew, TetFlag::Processed];
    #[inline]
    fn mask(self) -> u8 {
        match self {
            TetFlag::Removed => 0b001,
            TetFlag::RemovedNew => 0b010,
            TetFlag::Processed => 0b100,
        }
    }
}

/// Small set of flags packed into one byte.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct FlagSet<F: Flag> {
    bits: u8,
    _flag: PhantomData<F>,
}

impl<F: Flag> FlagSet<F> {
    pub const fn empty() -> Self {
        Self {
            bits: 0,
            _flag: PhantomData,
        }
    }

    #[inline]
    pub fn contains(&self, f: F) -> bool {
        self.bits & f.mask() != 0
    }

    #[inline]
    pub fn any(&self, fs: &[F]) -> bool {
        fs.iter().any(|f| self.contains(*f))
    }

    #[inline]
    pub fn insert(&mut self, f: F) {
        self.bits |= f.mask();
    }

    #[inline]
    pub fn remove(&mut self, f: F) {
        self.bits &= !f.mask();
    }

    #[inline]
    pub fn set(&mut self, f: F, on: bool) {
        if on {
            self.insert(f)
        } else {
            self.remove(f)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        F::ALL.iter().copied().filter(move |f| self.contains(*f))
    }
}

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: Flag + fmt::Debug> fmt::Debug for FlagSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
