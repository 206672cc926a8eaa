use crate::{KodError, KodResult};

/// Bounds-checked cursor over a message body.
///
/// Every read either returns the bytes or [`KodError::BytecodeOverrun`]; the
/// position is left untouched by a failed read.
#[derive(Debug, Clone)]
pub struct CodeReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> CodeReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline(always)]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    /// Moves the cursor. `target` must lie inside the body.
    pub fn seek(&mut self, target: usize) -> KodResult<()> {
        if target >= self.bytes.len() {
            return Err(KodError::BranchOutOfRange {
                target: u32::try_from(target).unwrap_or(u32::MAX),
                len: self.bytes.len(),
            });
        }
        self.pos = target;
        Ok(())
    }

    #[inline(always)]
    fn take<const N: usize>(&mut self) -> KodResult<[u8; N]> {
        let end = self.pos.checked_add(N);
        match end.and_then(|end| self.bytes.get(self.pos..end)) {
            Some(slice) => {
                let mut out = [0; N];
                out.copy_from_slice(slice);
                self.pos += N;
                Ok(out)
            }
            None => Err(KodError::BytecodeOverrun {
                offset: self.pos,
                needed: N,
                len: self.bytes.len(),
            }),
        }
    }

    #[inline(always)]
    pub fn read_u8(&mut self) -> KodResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    #[inline(always)]
    pub fn read_u32(&mut self) -> KodResult<u32> {
        self.take::<4>().map(u32::from_le_bytes)
    }
}
