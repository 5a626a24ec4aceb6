use crate::shares::{IntRing2k, RingElement, RingTensor};
use eyre::{bail, eyre, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Ring tensor as it travels between parties.
///
/// Elements are stored in native byte order; both ends of a transport are
/// assumed to share the architecture.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct TensorPayload {
    pub ring_bytes: u8,
    pub shape:      Vec<u32>,
    pub data:       Vec<u8>,
}

/// Value sent over the network
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum NetworkValue {
    TripleId(u64),
    Tensor(TensorPayload),
    Batch(Vec<NetworkValue>),
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
pub enum DescriptorByte {
    TripleId = 0x01,
    Tensor = 0x02,
    Batch = 0x03,
}

fn read_u32(serialized: &[u8], at: usize) -> Result<u32> {
    let bytes = serialized
        .get(at..at + 4)
        .ok_or_else(|| eyre!("buffer too short for u32 at offset {at}"))?;
    Ok(u32::from_le_bytes(<[u8; 4]>::try_from(bytes)?))
}

impl NetworkValue {
    /// Fails if the tensor has more than 255 axes or an axis longer than
    /// `u32::MAX`, which the wire header cannot describe.
    pub fn from_tensor<T: IntRing2k>(tensor: &RingTensor<T>) -> Result<Self> {
        if tensor.shape().len() > u8::MAX as usize {
            bail!("tensor with {} axes does not fit the header", tensor.shape().len());
        }
        let shape = tensor
            .shape()
            .iter()
            .map(|d| u32::try_from(*d).map_err(|_| eyre!("axis of length {d} does not fit u32")))
            .collect::<Result<Vec<_>>>()?;
        let values: Vec<T> = tensor.iter().map(|x| x.convert()).collect();
        Ok(NetworkValue::Tensor(TensorPayload {
            ring_bytes: T::BYTES as u8,
            shape,
            data: bytemuck::cast_slice(&values).to_vec(),
        }))
    }

    pub fn into_tensor<T: IntRing2k>(self) -> Result<RingTensor<T>> {
        let payload = match self {
            NetworkValue::Tensor(payload) => payload,
            other => bail!("expected a tensor, got {:?}", other.descriptor()),
        };
        if payload.ring_bytes as usize != T::BYTES {
            bail!(
                "ring width mismatch: received {} bytes per element, expected {}",
                payload.ring_bytes,
                T::BYTES
            );
        }
        let shape: Vec<usize> = payload.shape.iter().map(|d| *d as usize).collect();
        let len: usize = shape.iter().product();
        if payload.data.len() != len * T::BYTES {
            bail!(
                "tensor payload of {} bytes does not match shape {shape:?}",
                payload.data.len()
            );
        }
        let values = payload
            .data
            .chunks_exact(T::BYTES)
            .map(|c| RingElement(bytemuck::pod_read_unaligned::<T>(c)))
            .collect();
        Ok(RingTensor::from_shape_vec(&shape, values)?)
    }

    pub fn into_triple_id(self) -> Result<u64> {
        match self {
            NetworkValue::TripleId(id) => Ok(id),
            other => bail!("expected a triple id, got {:?}", other.descriptor()),
        }
    }

    pub fn into_batch(self) -> Result<Vec<NetworkValue>> {
        match self {
            NetworkValue::Batch(values) => Ok(values),
            other => bail!("expected a batch, got {:?}", other.descriptor()),
        }
    }

    fn descriptor(&self) -> DescriptorByte {
        match self {
            NetworkValue::TripleId(_) => DescriptorByte::TripleId,
            NetworkValue::Tensor(_) => DescriptorByte::Tensor,
            NetworkValue::Batch(_) => DescriptorByte::Batch,
        }
    }

    fn byte_len(&self) -> usize {
        match self {
            NetworkValue::TripleId(_) => 1 + 8,
            NetworkValue::Tensor(p) => 1 + 1 + 1 + 4 * p.shape.len() + 4 + p.data.len(),
            NetworkValue::Batch(values) => {
                1 + 4 + values.iter().map(|v| v.byte_len()).sum::<usize>()
            }
        }
    }

    fn to_network_inner(&self, res: &mut Vec<u8>) -> Result<()> {
        res.push(self.descriptor().into());

        match self {
            NetworkValue::TripleId(id) => res.extend_from_slice(&id.to_le_bytes()),
            NetworkValue::Tensor(p) => {
                let ndim = u8::try_from(p.shape.len())
                    .map_err(|_| eyre!("tensor with {} axes does not fit the header", p.shape.len()))?;
                let data_len = u32::try_from(p.data.len())
                    .map_err(|_| eyre!("tensor payload of {} bytes is too large", p.data.len()))?;
                res.push(p.ring_bytes);
                res.push(ndim);
                for d in &p.shape {
                    res.extend_from_slice(&d.to_le_bytes());
                }
                res.extend_from_slice(&data_len.to_le_bytes());
                res.extend_from_slice(&p.data);
            }
            NetworkValue::Batch(values) => {
                let len_at = res.len();
                // placeholder for the payload length
                res.extend_from_slice(&[0_u8; 4]);
                for value in values {
                    value.to_network_inner(res)?;
                }
                let payload_len = u32::try_from(res.len() - len_at - 4)
                    .map_err(|_| eyre!("batch payload is too large"))?;
                res[len_at..len_at + 4].copy_from_slice(&payload_len.to_le_bytes());
            }
        }
        Ok(())
    }

    pub fn to_network(&self) -> Result<Vec<u8>> {
        let mut res = Vec::with_capacity(self.byte_len());
        self.to_network_inner(&mut res)?;
        Ok(res)
    }

    pub fn from_network(serialized: Result<Vec<u8>>) -> Result<Self> {
        let v = serialized?;
        let (value, used) = Self::from_network_slice(&v)?;
        if used != v.len() {
            bail!("{} trailing bytes after network value", v.len() - used);
        }
        Ok(value)
    }

    /// Parses one value from the front of `serialized`, returning it together
    /// with the number of bytes consumed.
    fn from_network_slice(serialized: &[u8]) -> Result<(Self, usize)> {
        let Some(&descriptor) = serialized.first() else {
            bail!("Empty serialized data");
        };
        let descriptor_byte = DescriptorByte::try_from(descriptor)
            .map_err(|_| eyre!("Invalid network value type {descriptor:#04x}"))?;
        match descriptor_byte {
            DescriptorByte::TripleId => {
                let bytes = serialized
                    .get(1..9)
                    .ok_or_else(|| eyre!("Invalid length for TripleId"))?;
                Ok((
                    NetworkValue::TripleId(u64::from_le_bytes(<[u8; 8]>::try_from(bytes)?)),
                    9,
                ))
            }
            DescriptorByte::Tensor => {
                if serialized.len() < 3 {
                    bail!("Invalid length for Tensor header");
                }
                let ring_bytes = serialized[1];
                let ndim = serialized[2] as usize;
                let mut idx = 3;
                let mut shape = Vec::with_capacity(ndim);
                for _ in 0..ndim {
                    shape.push(read_u32(serialized, idx)?);
                    idx += 4;
                }
                let data_len = read_u32(serialized, idx)? as usize;
                idx += 4;
                let data = serialized
                    .get(idx..idx + data_len)
                    .ok_or_else(|| eyre!("Tensor payload truncated"))?
                    .to_vec();
                Ok((
                    NetworkValue::Tensor(TensorPayload {
                        ring_bytes,
                        shape,
                        data,
                    }),
                    idx + data_len,
                ))
            }
            DescriptorByte::Batch => {
                let payload_len = read_u32(serialized, 1)? as usize;
                let end_idx = 5 + payload_len;
                if serialized.len() < end_idx {
                    bail!(
                        "Batch length mismatch: {} vs expected {}",
                        serialized.len() - 5,
                        payload_len
                    );
                }
                let mut res = Vec::new();
                let mut idx = 5;
                while idx < end_idx {
                    let (value, used) = Self::from_network_slice(&serialized[idx..end_idx])?;
                    res.push(value);
                    idx += used;
                }
                Ok((NetworkValue::Batch(res), end_idx))
            }
        }
    }
}
