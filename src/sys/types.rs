//! Tipos fundamentais do sistema

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Pid(pub u32);

impl Pid {
    pub const KERNEL: Pid = Pid(0);
    pub const INIT: Pid = Pid(1);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Thread ID
///
/// Codifica a posição na arena de threads: os 16 bits baixos são o slot e os
/// 16 bits altos a geração do slot. Um TID antigo nunca resolve para a thread
/// que reutilizou o mesmo slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Tid(pub u32);

impl Tid {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn from_parts(generation: u16, slot: u16) -> Self {
        Self(((generation as u32) << 16) | slot as u32)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Índice do slot na arena
    pub const fn slot(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Geração do slot quando a thread foi criada
    pub const fn generation(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

/// Identificador lógico de CPU (0..nr_cpus)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CpuId(pub u32);

impl CpuId {
    /// CPU de boot (BSP)
    pub const BOOT: CpuId = CpuId(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Raiz da tabela de páginas de um espaço de endereçamento (CR3 no x86_64)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct AddressSpace(pub u64);

impl AddressSpace {
    pub const fn new(root: u64) -> Self {
        Self(root)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Referência não-proprietária ao processo dono de uma thread.
///
/// O subsistema de processos continua dono do espaço de endereçamento; a
/// thread só guarda o que o dispatcher precisa para decidir a troca de CR3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessRef {
    pub pid: Pid,
    pub space: AddressSpace,
}

impl ProcessRef {
    pub const fn new(pid: Pid, space: AddressSpace) -> Self {
        Self { pid, space }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tid_packs_slot_and_generation() {
        let tid = Tid::from_parts(7, 300);
        assert_eq!(tid.slot(), 300);
        assert_eq!(tid.generation(), 7);
        assert_eq!(tid.as_u32(), (7 << 16) | 300);
    }

    #[test]
    fn same_slot_new_generation_is_a_different_tid() {
        assert_ne!(Tid::from_parts(1, 4), Tid::from_parts(2, 4));
    }
}
