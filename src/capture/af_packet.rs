//! AF_PACKET socket implementation

use super::{Capture, RxInfo};
use crate::protocol::MacAddr;
use crate::{Error, Result};
use std::net::Ipv4Addr;
use std::os::unix::io::{AsRawFd, RawFd};
use tokio::io::unix::AsyncFd;

/// AF_PACKET socket bound to a single interface
pub struct AfPacketSocket {
    async_fd: AsyncFd<RawFd>,
    name: String,
    ifindex: i32,
    promiscuous: bool,
}

impl AfPacketSocket {
    /// Open a raw socket on `ifname`, optionally switching the interface to
    /// promiscuous mode for the lifetime of the socket.
    pub fn bind(ifname: &str, promiscuous: bool) -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                (libc::ETH_P_ALL as u16).to_be() as i32,
            )
        };

        if fd < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        match Self::setup(fd, ifname, promiscuous) {
            Ok(ifindex) => {
                let async_fd = match AsyncFd::new(fd) {
                    Ok(async_fd) => async_fd,
                    Err(e) => {
                        unsafe { libc::close(fd) };
                        return Err(Error::Io(e));
                    }
                };
                Ok(Self {
                    async_fd,
                    name: ifname.to_string(),
                    ifindex,
                    promiscuous,
                })
            }
            Err(e) => {
                unsafe { libc::close(fd) };
                Err(e)
            }
        }
    }

    fn setup(fd: RawFd, ifname: &str, promiscuous: bool) -> Result<i32> {
        let ifindex = Self::get_ifindex(fd, ifname)?;

        let sockaddr = libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: (libc::ETH_P_ALL as u16).to_be(),
            sll_ifindex: ifindex,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: 0,
            sll_addr: [0; 8],
        };

        let ret = unsafe {
            libc::bind(
                fd,
                &sockaddr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as u32,
            )
        };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        if promiscuous {
            Self::set_promisc(fd, ifindex, true)?;
        }

        Ok(ifindex)
    }

    fn ifreq(ifname: &str) -> Result<libc::ifreq> {
        let not_found = || Error::InterfaceNotFound {
            name: ifname.to_string(),
        };

        let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
        // Leave room for the trailing NUL
        if ifname.is_empty() || ifname.len() >= ifr.ifr_name.len() || ifname.contains('\0') {
            return Err(not_found());
        }
        for (dst, src) in ifr.ifr_name.iter_mut().zip(ifname.bytes()) {
            *dst = src as libc::c_char;
        }
        Ok(ifr)
    }

    fn get_ifindex(fd: RawFd, ifname: &str) -> Result<i32> {
        let mut ifr = Self::ifreq(ifname)?;

        let ret = unsafe { libc::ioctl(fd, libc::SIOCGIFINDEX, &mut ifr) };
        if ret < 0 {
            return Err(Error::InterfaceNotFound {
                name: ifname.to_string(),
            });
        }

        Ok(unsafe { ifr.ifr_ifru.ifru_ifindex })
    }

    fn set_promisc(fd: RawFd, ifindex: i32, enable: bool) -> Result<()> {
        let mreq = libc::packet_mreq {
            mr_ifindex: ifindex,
            mr_type: libc::PACKET_MR_PROMISC as u16,
            mr_alen: 0,
            mr_address: [0; 8],
        };

        let optname = if enable {
            libc::PACKET_ADD_MEMBERSHIP
        } else {
            libc::PACKET_DROP_MEMBERSHIP
        };

        let ret = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_PACKET,
                optname,
                &mreq as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::packet_mreq>() as u32,
            )
        };

        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        Ok(())
    }

    /// Hardware address of the bound interface
    pub fn mac_address(&self) -> Result<MacAddr> {
        let mut ifr = Self::ifreq(&self.name)?;

        let ret = unsafe { libc::ioctl(self.as_raw_fd(), libc::SIOCGIFHWADDR, &mut ifr) };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        let data = unsafe { ifr.ifr_ifru.ifru_hwaddr.sa_data };
        let mut octets = [0u8; 6];
        for (dst, src) in octets.iter_mut().zip(data.iter()) {
            *dst = *src as u8;
        }
        Ok(MacAddr(octets))
    }

    /// Primary IPv4 address of the bound interface
    pub fn ipv4_address(&self) -> Result<Ipv4Addr> {
        let mut ifr = Self::ifreq(&self.name)?;

        let ret = unsafe { libc::ioctl(self.as_raw_fd(), libc::SIOCGIFADDR, &mut ifr) };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        let addr = unsafe {
            let sa = &ifr.ifr_ifru.ifru_addr as *const libc::sockaddr as *const libc::sockaddr_in;
            (*sa).sin_addr.s_addr
        };
        Ok(Ipv4Addr::from(u32::from_be(addr)))
    }

    /// Receive a frame (async)
    ///
    /// Frames the host itself transmitted on the interface are skipped.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<RxInfo> {
        loop {
            let mut guard = self.async_fd.readable().await.map_err(Error::Io)?;

            match guard.try_io(|inner| {
                let fd = *inner.get_ref();
                let mut from: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
                let mut from_len = std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
                let n = unsafe {
                    libc::recvfrom(
                        fd,
                        buf.as_mut_ptr() as *mut _,
                        buf.len(),
                        0,
                        &mut from as *mut _ as *mut libc::sockaddr,
                        &mut from_len,
                    )
                };
                if n < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok((n as usize, from.sll_pkttype))
                }
            }) {
                Ok(Ok((_, pkttype))) if pkttype == libc::PACKET_OUTGOING => continue,
                Ok(Ok((len, _))) => return Ok(RxInfo { len }),
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_would_block) => continue,
            }
        }
    }

    /// Send a frame (async)
    pub async fn send(&self, buf: &[u8]) -> Result<usize> {
        loop {
            let mut guard = self.async_fd.writable().await.map_err(Error::Io)?;

            match guard.try_io(|inner| {
                let fd = *inner.get_ref();
                let n = unsafe { libc::send(fd, buf.as_ptr() as *const _, buf.len(), 0) };
                if n < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            }) {
                Ok(Ok(len)) => return Ok(len),
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_would_block) => continue,
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ifindex(&self) -> i32 {
        self.ifindex
    }
}

impl AsRawFd for AfPacketSocket {
    fn as_raw_fd(&self) -> RawFd {
        *self.async_fd.get_ref()
    }
}

impl Drop for AfPacketSocket {
    fn drop(&mut self) {
        if self.promiscuous {
            let _ = Self::set_promisc(*self.async_fd.get_ref(), self.ifindex, false);
        }
        unsafe { libc::close(*self.async_fd.get_ref()) };
    }
}

impl Capture for AfPacketSocket {
    async fn recv(&self, buf: &mut [u8]) -> Result<RxInfo> {
        AfPacketSocket::recv(self, buf).await
    }

    async fn send(&self, buf: &[u8]) -> Result<usize> {
        AfPacketSocket::send(self, buf).await
    }
}
