//! Bitmap de níveis de prioridade

/// Bitmap de 32 bits: bit N ligado ⇔ nível N tem ao menos uma thread.
///
/// O bit menos significativo é o nível mais urgente, então a seleção é um
/// único `trailing_zeros`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityBitmap(u32);

impl PriorityBitmap {
    /// Número de níveis representáveis
    pub const BITS: usize = 32;

    pub const fn new() -> Self {
        Self(0)
    }

    /// Define um bit
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < Self::BITS);
        self.0 |= 1 << index;
    }

    /// Limpa um bit
    pub fn clear(&mut self, index: usize) {
        debug_assert!(index < Self::BITS);
        self.0 &= !(1 << index);
    }

    /// Testa um bit
    pub fn test(&self, index: usize) -> bool {
        debug_assert!(index < Self::BITS);
        (self.0 & (1 << index)) != 0
    }

    /// Primeiro bit ligado (nível mais urgente não vazio)
    pub fn first_set(&self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_set_is_lowest_index() {
        let mut bm = PriorityBitmap::new();
        assert_eq!(bm.first_set(), None);
        bm.set(17);
        bm.set(3);
        bm.set(31);
        assert_eq!(bm.first_set(), Some(3));
        bm.clear(3);
        assert_eq!(bm.first_set(), Some(17));
        assert!(bm.test(31));
        assert!(!bm.test(3));
    }

    #[test]
    fn empty_after_clearing_everything() {
        let mut bm = PriorityBitmap::new();
        bm.set(0);
        bm.clear(0);
        assert!(bm.is_empty());
        assert_eq!(bm.bits(), 0);
    }
}
